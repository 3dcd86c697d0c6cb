/// Classification of an exit code under a resource's policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Success,
    Failed,
}

impl Verdict {
    pub fn is_success(self) -> bool {
        self == Verdict::Success
    }
}

/// Decide whether an exit code counts as success.
///
/// With `fail_if_nonzero` off every exit code is a success; the code itself
/// is still recorded by the caller. Invocation errors never get here.
pub fn evaluate(exit_code: i32, fail_if_nonzero: bool) -> Verdict {
    if fail_if_nonzero && exit_code != 0 {
        Verdict::Failed
    } else {
        Verdict::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_always_succeeds() {
        assert_eq!(evaluate(0, true), Verdict::Success);
        assert_eq!(evaluate(0, false), Verdict::Success);
    }

    #[test]
    fn nonzero_fails_only_when_enforced() {
        for code in [1, 2, 127, 137, -1] {
            assert_eq!(evaluate(code, true), Verdict::Failed, "code {code}");
            assert_eq!(evaluate(code, false), Verdict::Success, "code {code}");
        }
    }

    #[test]
    fn is_success() {
        assert!(Verdict::Success.is_success());
        assert!(!Verdict::Failed.is_success());
    }
}
