/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Strip every whitespace character (devices sometimes send "123 456").
pub fn strip_whitespace(input: &str) -> String {
    input.chars().filter(|c| !c.is_whitespace()).collect()
}

/// `true` when `code` is exactly six ASCII digits.
pub fn is_pairing_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_whitespace() {
        assert_eq!(strip_whitespace(" 123 456\n"), "123456");
        assert_eq!(strip_whitespace("\t"), "");
    }

    #[test]
    fn test_is_pairing_code() {
        assert!(is_pairing_code("000000"));
        assert!(is_pairing_code("123456"));
        assert!(!is_pairing_code("12345"));
        assert!(!is_pairing_code("1234567"));
        assert!(!is_pairing_code("12a456"));
        // full-width digits are not ASCII
        assert!(!is_pairing_code("１２３４５６"));
    }
}
