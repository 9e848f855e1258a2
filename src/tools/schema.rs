//! 按目录中的 JSON Schema 校验原始参数
//!
//! 只支持目录实际用到的子集：`type: object` 的顶层、`required`、
//! `string` / `boolean` 属性和 `enum`。未声明的字段原样保留，不报错。

use serde_json::{Map, Value};

/// 校验并规整参数，返回可直接反序列化为类型化结构的对象
///
/// - `null` 视为空对象
/// - 必填字段必须出现且不为 `null`
/// - 可选字段允许 `null`（表示清空）
/// - 类型规整见 [`normalize`]
pub fn validate(schema: &Value, args: Value) -> Result<Map<String, Value>, String> {
    let args = normalize(schema, args)?;

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            match args.get(field) {
                None | Some(Value::Null) => {
                    return Err(format!("Missing required parameter: {}", field));
                }
                _ => {}
            }
        }
    }

    for (field, prop) in properties(schema) {
        let Some(value) = args.get(field).filter(|v| !v.is_null()) else {
            continue;
        };
        if let Some(allowed) = prop.get("enum").and_then(Value::as_array) {
            check_enum(field, allowed, value)?;
        }
    }

    Ok(args)
}

/// 只做类型规整，不检查必填和枚举；REST 前端与调度桥共用
///
/// `"true"` / `"false"` 字符串会被规整为布尔值，数字会被规整为字符串。
pub fn normalize(schema: &Value, args: Value) -> Result<Map<String, Value>, String> {
    let mut args = match args {
        Value::Null => Map::new(),
        Value::Object(map) => map,
        other => {
            return Err(format!(
                "Arguments must be a JSON object, got {}",
                type_name(&other)
            ));
        }
    };

    for (field, prop) in properties(schema) {
        let Some(value) = args.get_mut(field).filter(|v| !v.is_null()) else {
            continue;
        };
        if let Some(expected) = prop.get("type").and_then(Value::as_str) {
            coerce(field, expected, value)?;
        }
    }

    Ok(args)
}

fn properties(schema: &Value) -> impl Iterator<Item = (&String, &Value)> {
    schema
        .get("properties")
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
}

fn coerce(field: &str, expected: &str, value: &mut Value) -> Result<(), String> {
    let coerced = match (expected, &*value) {
        ("string", Value::String(_)) | ("boolean", Value::Bool(_)) => return Ok(()),
        ("string", Value::Number(n)) => Value::String(n.to_string()),
        ("boolean", Value::String(s)) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
        ("boolean", Value::String(s)) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
        ("string" | "boolean", other) => {
            return Err(format!(
                "Invalid type for '{}': expected {}, got {}",
                field,
                expected,
                type_name(other)
            ));
        }
        _ => return Ok(()),
    };
    *value = coerced;
    Ok(())
}

fn check_enum(field: &str, allowed: &[Value], value: &Value) -> Result<(), String> {
    let matched = match value {
        Value::String(s) => allowed
            .iter()
            .filter_map(Value::as_str)
            .any(|a| a.eq_ignore_ascii_case(s.trim())),
        other => allowed.contains(other),
    };
    if matched {
        return Ok(());
    }
    let options: Vec<String> = allowed
        .iter()
        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
        .collect();
    Err(format!(
        "Invalid value for '{}': {} (expected one of: {})",
        field,
        value,
        options.join(", ")
    ))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::catalog::{CREATE_TODO, GET_TODOS, UPDATE_TODO, find_tool};
    use serde_json::json;

    fn schema(name: &str) -> Value {
        find_tool(name).unwrap().input_schema
    }

    #[test]
    fn test_missing_required_field() {
        let err = validate(&schema(CREATE_TODO), json!({"priority": "high"})).unwrap_err();
        assert_eq!(err, "Missing required parameter: title");

        let err = validate(&schema(CREATE_TODO), json!({"title": null})).unwrap_err();
        assert_eq!(err, "Missing required parameter: title");
    }

    #[test]
    fn test_enum_violation() {
        let err = validate(
            &schema(CREATE_TODO),
            json!({"title": "Deploy", "priority": "critical"}),
        )
        .unwrap_err();
        assert!(err.contains("priority"), "{}", err);
        assert!(err.contains("low, medium, high, urgent"), "{}", err);
    }

    #[test]
    fn test_type_mismatch() {
        let err = validate(&schema(UPDATE_TODO), json!({"id": "x", "completed": [1]})).unwrap_err();
        assert!(err.contains("expected boolean"), "{}", err);
    }

    #[test]
    fn test_coercion() {
        let args = validate(
            &schema(UPDATE_TODO),
            json!({"id": 42, "completed": "TRUE", "dueDate": null}),
        )
        .unwrap();
        assert_eq!(args["id"], json!("42"));
        assert_eq!(args["completed"], json!(true));
        assert_eq!(args["dueDate"], Value::Null);
    }

    #[test]
    fn test_normalize_skips_required_and_enum() {
        let args = normalize(
            &schema(UPDATE_TODO),
            json!({"completed": "false", "priority": "critical"}),
        )
        .unwrap();
        assert_eq!(args["completed"], json!(false));
        assert_eq!(args["priority"], json!("critical"));
        assert!(args.get("id").is_none());

        let err = normalize(&schema(CREATE_TODO), json!({"title": true})).unwrap_err();
        assert!(err.contains("expected string"), "{}", err);
    }

    #[test]
    fn test_null_and_object_payloads() {
        assert!(validate(&schema(GET_TODOS), Value::Null).unwrap().is_empty());
        assert!(validate(&schema(GET_TODOS), json!("text")).is_err());
        let extra = validate(&schema(GET_TODOS), json!({"verbose": true})).unwrap();
        assert_eq!(extra["verbose"], json!(true));
    }
}
