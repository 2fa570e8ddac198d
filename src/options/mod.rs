//! Builders for the per-role option dictionaries WAMP messages carry
//! alongside their URI (SUBSCRIBE.Options, CALL.Options, REGISTER.Options,
//! ...). [`option::OptionBuilder`] is the shared scaffolding; each
//! submodule adds the typed setters relevant to that role.

pub mod call;
pub mod option;
pub mod register;
pub mod subscription;

pub use call::CallOptions;
pub use option::{OptionBuilder, WampOption};
pub use register::RegisterOptions;
pub use subscription::SubscribeOptions;
