//! 标识符与值安全层
//!
//! 所有进入语句文本的表名/列名必须先通过这里的校验；
//! 值永远不会被拼接进语句，总是以绑定参数传递

use crate::error::PanelDbResult;
use crate::types::DatabaseType;
use once_cell::sync::Lazy;
use regex::Regex;

/// 合法标识符模式，校验失败的标识符在任何网络调用之前被拒绝
static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("标识符正则必然合法"));

/// 校验表名或列名
///
/// 不匹配 `^[a-zA-Z_][a-zA-Z0-9_]*$` 的标识符一律拒绝，
/// 这是每个适配器方法的安全不变量
pub fn validate_identifier(name: &str) -> PanelDbResult<()> {
    if IDENTIFIER_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(crate::panel_error!(identifier, name))
    }
}

/// 按方言转义标识符（先校验）
pub fn escape_identifier(db_type: DatabaseType, name: &str) -> PanelDbResult<String> {
    validate_identifier(name)?;
    Ok(match db_type {
        DatabaseType::PostgreSQL => format!("\"{}\"", name),
        DatabaseType::MySQL => format!("`{}`", name),
        DatabaseType::SqlServer => format!("[{}]", name),
        // MongoDB 不拼接语句，校验后原样返回
        DatabaseType::MongoDB => name.to_string(),
    })
}

/// 构建方言正确的参数占位符（index 从 1 开始）
pub fn placeholder(db_type: DatabaseType, index: usize) -> String {
    match db_type {
        DatabaseType::PostgreSQL => format!("${}", index),
        DatabaseType::MySQL => "?".to_string(),
        DatabaseType::SqlServer => format!("@P{}", index),
        DatabaseType::MongoDB => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        for name in ["users", "_private", "Table1", "order_items", "a"] {
            assert!(validate_identifier(name).is_ok(), "{} 应当合法", name);
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        for name in [
            "",
            "1table",
            "users; DROP TABLE x",
            "na me",
            "col-name",
            "用户",
            "a\"b",
            "a`b",
        ] {
            assert!(validate_identifier(name).is_err(), "{} 应当被拒绝", name);
        }
    }

    #[test]
    fn test_escape_identifier() {
        assert_eq!(
            escape_identifier(DatabaseType::PostgreSQL, "users").unwrap(),
            "\"users\""
        );
        assert_eq!(
            escape_identifier(DatabaseType::MySQL, "users").unwrap(),
            "`users`"
        );
        assert_eq!(
            escape_identifier(DatabaseType::SqlServer, "users").unwrap(),
            "[users]"
        );
        assert_eq!(
            escape_identifier(DatabaseType::MongoDB, "users").unwrap(),
            "users"
        );
        assert!(escape_identifier(DatabaseType::PostgreSQL, "bad name").is_err());
    }

    #[test]
    fn test_placeholder() {
        assert_eq!(placeholder(DatabaseType::PostgreSQL, 3), "$3");
        assert_eq!(placeholder(DatabaseType::MySQL, 3), "?");
        assert_eq!(placeholder(DatabaseType::SqlServer, 3), "@P3");
    }
}
