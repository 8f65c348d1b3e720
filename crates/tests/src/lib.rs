//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - tracker ⇄ mapper 协议性质（进程内链路）
//! - TCP 回环上的同一协议
//! - 可运行协作者的全栈会话

#[cfg(test)]
mod support;

#[cfg(test)]
mod protocol_tests;

#[cfg(test)]
mod transport_tests;

#[cfg(test)]
mod full_stack_tests;
