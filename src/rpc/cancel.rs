pub use crate::common::CancelMode;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::WampDict;

    #[test]
    fn default_cancel_mode_is_kill() {
        assert_eq!(CancelMode::from_options(&WampDict::new()), CancelMode::Kill);
    }
}
