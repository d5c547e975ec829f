//! Parameter store interface
//!
//! The supervisor reads its settings from an externally-editable key/value
//! store and reacts to writes against the watched keys. The store itself is
//! a collaborator behind this small boundary: [`ParamStore`] for reads, and a
//! change event per accepted write, delivered over a channel by the concrete
//! store implementation.

pub mod file;
pub mod ipc;

pub use file::FileStore;
pub use ipc::ControlServer;

/// One write to a watched parameter, carrying the key and the new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamChange {
    pub key: String,
    pub value: String,
}

/// Read access to the parameter store.
pub trait ParamStore: Send + Sync {
    /// Current value of a parameter, if it has ever been set.
    fn get(&self, key: &str) -> Option<String>;

    /// Interprets a parameter as a yes/no switch. The store holds `"yes"`
    /// or `"no"`; an absent key or any other value reads as no.
    fn is_yes(&self, key: &str) -> bool {
        self.get(key).as_deref() == Some("yes")
    }
}
