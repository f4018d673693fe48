//! Textual patches for delta storage.
//!
//! Deltas are written in unified diff format so version directories stay
//! inspectable with ordinary tools.

use diffy::Patch;

use crate::error::{Error, Result};

/// Renders the unified diff that turns `base` into `updated`.
pub fn diff(base: &str, updated: &str) -> String {
    diffy::create_patch(base, updated).to_string()
}

/// Applies a stored unified diff to `base`, producing the updated text.
pub fn apply(base: &str, patch_text: &str) -> Result<String> {
    let patch = Patch::from_str(patch_text).map_err(|e| Error::PatchApply(e.to_string()))?;
    diffy::apply(base, &patch).map_err(|e| Error::PatchApply(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn test_diff_apply_round_trip() {
        let base = "alpha\nbeta\ngamma\n";
        let updated = "alpha\nbeta changed\ngamma\ndelta\n";

        let patch = diff(base, updated);
        assert_eq!(apply(base, &patch).unwrap(), updated);
    }

    #[test]
    fn test_identical_inputs() {
        let text = "same\nlines\n";
        let patch = diff(text, text);
        assert_eq!(apply(text, &patch).unwrap(), text);
    }

    #[test]
    fn test_growth_from_empty() {
        let patch = diff("", "fresh content\n");
        assert_eq!(apply("", &patch).unwrap(), "fresh content\n");
    }

    #[test]
    fn test_apply_rejects_mismatched_base() {
        let patch = diff("one\ntwo\nthree\n", "one\n2\nthree\n");
        let err = apply("completely\nunrelated\ntext\n", &patch).unwrap_err();
        assert!(matches!(err, Error::PatchApply(_)));
    }

    #[test]
    fn test_apply_rejects_garbage_patch() {
        let err = apply("anything\n", "this is not a patch").unwrap_err();
        assert!(matches!(err, Error::PatchApply(_)));
    }
}
