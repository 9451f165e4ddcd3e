//! # Store namespaces and path helpers.
//!
//! All paths are relative to the store root; writes are additionally
//! prefixed by the per-node [`MonitorConfig::prefix`](crate::MonitorConfig).
//!
//! | Namespace  | Pattern                    | Semantics                          |
//! |------------|----------------------------|------------------------------------|
//! | Control    | `/mon/ctl/<id>`            | start/stop/auto intents, watched   |
//! | Definition | `/mon/def/<id>/<param>`    | read-only unit configuration       |
//! | Lock       | `/lock/<id>`               | cross-node mutual exclusion        |
//! | Status     | `/mon/status/<id>/<param>` | node-published unit state          |

/// Control namespace root.
pub const CTL_KEY: &str = "/mon/ctl";
/// Definition namespace root.
pub const DEF_KEY: &str = "/mon/def";
/// Lock namespace root.
pub const LOCK_KEY: &str = "/lock";
/// Status namespace root.
pub const STATUS_KEY: &str = "/mon/status";

/// Control namespace directory prefix (with trailing slash).
pub const CTL_DIR: &str = "/mon/ctl/";
/// Definition namespace directory prefix (with trailing slash).
pub const DEF_DIR: &str = "/mon/def/";
/// Lock namespace directory prefix (with trailing slash).
pub const LOCK_DIR: &str = "/lock/";
/// Status namespace directory prefix (with trailing slash).
pub const STATUS_DIR: &str = "/mon/status/";

/// One-level watch glob for the control namespace.
pub fn ctl_glob() -> String {
    format!("{CTL_KEY}/*")
}

/// One-level watch glob for the lock namespace.
pub fn lock_glob() -> String {
    format!("{LOCK_KEY}/*")
}

/// Control entry path for a unit id.
pub fn ctl_path(id: &str) -> String {
    format!("{CTL_DIR}{id}")
}

/// Definition parameter path for a unit id.
pub fn def_path(id: &str, param: &str) -> String {
    format!("{DEF_DIR}{id}/{param}")
}

/// Lock entry path for a unit id, under the node's write prefix.
pub fn lock_path(prefix: &str, id: &str) -> String {
    format!("{prefix}{LOCK_DIR}{id}")
}

/// Status parameter path for a unit id, under the node's write prefix.
pub fn status_path(prefix: &str, id: &str, param: &str) -> String {
    format!("{prefix}{STATUS_DIR}{id}/{param}")
}

/// Splits a path into its directory prefix (with trailing slash) and leaf.
///
/// `"/mon/ctl/web.service"` → `("/mon/ctl/", "web.service")`. A path with
/// no separator yields an empty directory and the whole input as the leaf.
pub fn split_path(p: &str) -> (&str, &str) {
    match p.rfind('/') {
        Some(i) => (&p[..=i], &p[i + 1..]),
        None => ("", p),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path_leaf() {
        assert_eq!(
            split_path("/mon/ctl/web.service"),
            ("/mon/ctl/", "web.service")
        );
        assert_eq!(split_path("/lock/db.socket"), ("/lock/", "db.socket"));
    }

    #[test]
    fn test_split_path_no_separator() {
        assert_eq!(split_path("bare"), ("", "bare"));
    }

    #[test]
    fn test_write_paths_carry_prefix() {
        assert_eq!(lock_path("/node-a", "web.service"), "/node-a/lock/web.service");
        assert_eq!(
            status_path("/node-a", "web.service", "pid"),
            "/node-a/mon/status/web.service/pid"
        );
        // Read paths are never prefixed.
        assert_eq!(def_path("web.service", "cmd"), "/mon/def/web.service/cmd");
    }

    #[test]
    fn test_globs_are_one_level() {
        assert_eq!(ctl_glob(), "/mon/ctl/*");
        assert_eq!(lock_glob(), "/lock/*");
    }
}
