use std::fmt;

/// The four handshakes the tracker can send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dispatch {
    /// Synthetic first-frame notification (clear-init)
    Init,
    /// Confirmed keyframe notification
    Map,
    /// Middle-of-buffer gap tracking request
    Gap,
    /// Terminal message, never acknowledged
    Shutdown,
}

impl Dispatch {
    /// Metrics / log label
    pub fn as_str(self) -> &'static str {
        match self {
            Dispatch::Init => "init",
            Dispatch::Map => "map",
            Dispatch::Gap => "gap",
            Dispatch::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
