use crate::options::option::{OptionBuilder, WampOption};
use crate::{Arg, WampDict};

/// Base struct for storing WampDict value
pub struct RegisterOptionItem(Option<WampDict>);

impl RegisterOptionItem {
    /// Sets the procedure's invocation policy (`single`, `roundrobin`,
    /// `random`, `first`, `last`) for shared registrations.
    pub fn with_invoke(&self, policy: &str) -> Self {
        self.with_option(WampOption::RegisterOption("invoke".to_owned(), Arg::String(policy.to_owned())))
    }

    /// Requests the caller's identity be disclosed on each INVOCATION.
    pub fn with_disclose_caller(&self, enabled: bool) -> Self {
        self.with_option(WampOption::RegisterOption("disclose_caller".to_owned(), Arg::Bool(enabled)))
    }

    /// Sets the matching policy used to interpret the procedure URI
    /// (`exact`, `prefix`, `wildcard`).
    pub fn with_match(&self, match_option: &str) -> Self {
        self.with_option(WampOption::RegisterOption("match".to_owned(), Arg::String(match_option.to_owned())))
    }
}

impl OptionBuilder for RegisterOptionItem {
    fn create(options: Option<WampDict>) -> Self {
        Self(options)
    }

    fn get_dict(&self) -> Option<WampDict> {
        self.0.clone()
    }
}

impl Default for RegisterOptionItem {
    fn default() -> Self {
        Self::empty()
    }
}

pub type RegisterOptions = RegisterOptionItem;
