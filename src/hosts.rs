// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Hosts file editing.
//!
//! Every provisioned domain resolves to loopback through two hosts file
//! entries, one for IPv4 and one for IPv6:
//!
//! ```text
//! 127.0.0.1	api.example.test
//! ::1	api.example.test
//! ```
//!
//! Editing is done on the file content as a string. Writing the result back,
//! which usually needs elevated privileges, is left to the caller.

/// Loopback addresses every domain is mapped to.
pub const LOOPBACK: [&str; 2] = ["127.0.0.1", "::1"];

/// Append loopback entries for `domain` to hosts file content.
///
/// Mappings that already exist are not duplicated. Content that does not end
/// with a newline gets one before the new entries.
pub fn add_domain(content: &str, domain: &str) -> String {
    let mut out = content.to_string();
    for address in LOOPBACK {
        if maps(content, address, domain) {
            continue;
        }

        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("{address}\t{domain}\n"));
    }

    out
}

/// Remove every entry that maps `domain`.
///
/// A line is removed when one of its host names is exactly `domain`, so
/// entries for other domains that merely contain `domain` survive. Comments
/// are never touched.
pub fn remove_domain(content: &str, domain: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for line in content.split_inclusive('\n') {
        if host_names(line).any(|name| name == domain) {
            continue;
        }
        out.push_str(line);
    }

    out
}

/// Check whether content has any entry for `domain`.
pub fn contains_domain(content: &str, domain: &str) -> bool {
    content
        .lines()
        .any(|line| host_names(line).any(|name| name == domain))
}

fn maps(content: &str, address: &str, domain: &str) -> bool {
    content.lines().any(|line| {
        let mut fields = entry(line).split_whitespace();
        fields.next() == Some(address) && fields.any(|name| name == domain)
    })
}

fn host_names(line: &str) -> impl Iterator<Item = &str> {
    entry(line).split_whitespace().skip(1)
}

fn entry(line: &str) -> &str {
    match line.split_once('#') {
        Some((entry, _)) => entry,
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    const HOSTS: &str = indoc! {r#"
        ##
        # Host Database
        ##
        127.0.0.1	localhost
        255.255.255.255	broadcasthost
        ::1             localhost
    "#};

    #[test]
    fn add_domain_appends_both_loopbacks() {
        let result = add_domain(HOSTS, "api.example.test");
        let expect = format!("{HOSTS}127.0.0.1\tapi.example.test\n::1\tapi.example.test\n");
        assert_eq!(result, expect);
    }

    #[test]
    fn add_domain_is_idempotent() {
        let once = add_domain(HOSTS, "api.example.test");
        let twice = add_domain(&once, "api.example.test");
        assert_eq!(once, twice);
    }

    #[test]
    fn add_domain_terminates_last_line() {
        let result = add_domain("127.0.0.1 localhost", "blog.test");
        assert_eq!(
            result,
            "127.0.0.1 localhost\n127.0.0.1\tblog.test\n::1\tblog.test\n"
        );
    }

    #[test]
    fn remove_domain_drops_exact_matches_only() {
        let content = indoc! {r#"
            127.0.0.1	localhost
            127.0.0.1	api.example.test
            ::1	api.example.test
            127.0.0.1	v2.api.example.test
            # 127.0.0.1	api.example.test
        "#};

        let result = remove_domain(content, "api.example.test");
        let expect = indoc! {r#"
            127.0.0.1	localhost
            127.0.0.1	v2.api.example.test
            # 127.0.0.1	api.example.test
        "#};
        assert_eq!(result, expect);
        assert!(!contains_domain(&result, "api.example.test"));
    }

    #[test]
    fn remove_domain_round_trips_with_add() {
        let added = add_domain(HOSTS, "blog.test");
        assert!(contains_domain(&added, "blog.test"));
        assert_eq!(remove_domain(&added, "blog.test"), HOSTS);
    }
}
