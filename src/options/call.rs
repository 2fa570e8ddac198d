use crate::options::option::{OptionBuilder, WampOption};
use crate::{Arg, WampDict};

/// Base struct for storing WampDict value
pub struct CallOptionItem(Option<WampDict>);

impl CallOptionItem {
    /// Requests progressive call results from the callee.
    pub fn with_receive_progress(&self, enabled: bool) -> Self {
        self.with_option(WampOption::CallOption("receive_progress".to_owned(), Arg::Bool(enabled)))
    }

    /// Sets a caller-side timeout (milliseconds) after which the dealer
    /// should cancel the call if no result has arrived.
    pub fn with_timeout(&self, timeout_ms: u64) -> Self {
        self.with_option(WampOption::CallOption("timeout".to_owned(), Arg::Integer(timeout_ms as i64)))
    }

    /// Requests the callee be told this caller's identity.
    pub fn with_disclose_me(&self, enabled: bool) -> Self {
        self.with_option(WampOption::CallOption("disclose_me".to_owned(), Arg::Bool(enabled)))
    }
}

impl OptionBuilder for CallOptionItem {
    fn create(options: Option<WampDict>) -> Self {
        Self(options)
    }

    fn get_dict(&self) -> Option<WampDict> {
        self.0.clone()
    }
}

impl Default for CallOptionItem {
    fn default() -> Self {
        Self::empty()
    }
}

pub type CallOptions = CallOptionItem;
