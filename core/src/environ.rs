//! Key/value sources that variables are read from.

use indexmap::IndexMap;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// A read-only mapping from environment keys to raw string values.
///
/// Resolution only ever performs point lookups by exact key.
pub trait Source {
    /// Look up the raw value stored under `key`.
    fn get(&self, key: &str) -> Option<Cow<'_, str>>;
}

/// The variable table of the current process.
///
/// A value that is not valid unicode is still present: invalid sequences are
/// replaced with `U+FFFD`, so it never falls back to an alias or default.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Source for ProcessEnv {
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        std::env::var_os(key).map(|value| Cow::Owned(value.to_string_lossy().into_owned()))
    }
}

impl<S: BuildHasher> Source for HashMap<String, String, S> {
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        HashMap::get(self, key).map(|v| Cow::Borrowed(v.as_str()))
    }
}

impl Source for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        BTreeMap::get(self, key).map(|v| Cow::Borrowed(v.as_str()))
    }
}

impl<S: BuildHasher> Source for IndexMap<String, String, S> {
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        IndexMap::get(self, key).map(|v| Cow::Borrowed(v.as_str()))
    }
}

impl<T: Source + ?Sized> Source for &T {
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        (**self).get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_map_sources() {
        let mut hash = HashMap::new();
        hash.insert("A".to_string(), "1".to_string());
        let btree: BTreeMap<String, String> = hash.clone().into_iter().collect();
        let index: IndexMap<String, String> = hash.clone().into_iter().collect();

        for source in [&hash as &dyn Source, &btree, &index] {
            assert_eq!(source.get("A").as_deref(), Some("1"));
            assert_eq!(source.get("a"), None);
        }
    }

    #[test]
    fn test_reference_source() {
        let mut map = BTreeMap::new();
        map.insert("K".to_string(), "v".to_string());
        let by_ref = &map;
        assert_eq!(Source::get(&by_ref, "K").as_deref(), Some("v"));
    }

    #[test]
    #[serial]
    fn test_process_env() {
        let key = "ENVBIND_TEST_PROCESS_ENV";
        // SAFETY: serialized with every other test touching the process environment.
        unsafe { std::env::set_var(key, "present") };
        assert_eq!(ProcessEnv.get(key).as_deref(), Some("present"));

        // SAFETY: see above.
        unsafe { std::env::remove_var(key) };
        assert_eq!(ProcessEnv.get(key), None);
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_process_env_non_unicode_is_present() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let key = "ENVBIND_TEST_NON_UNICODE";
        // SAFETY: serialized with every other test touching the process environment.
        unsafe { std::env::set_var(key, OsStr::from_bytes(b"80\xff")) };
        assert_eq!(ProcessEnv.get(key).as_deref(), Some("80\u{fffd}"));

        // SAFETY: see above.
        unsafe { std::env::remove_var(key) };
    }
}
