use std::collections::HashMap;

use crate::runtime::value::Value;

fn apply(op: &str, a: i64, b: i64) -> Option<i64> {
    Some(match op {
        "+" | "1" => a.wrapping_add(b),
        "-" | "2" => a.wrapping_sub(b),
        "*" | "3" => a.wrapping_mul(b),
        "/" | "4" if b == 0 => 0,
        "/" | "4" => a.wrapping_div(b),
        _ => return None,
    })
}

/// Recomputes `resultado` from `valor1 operacao valor2` once a receive
/// completes, for programs written against the calculator example.
/// `operacao` is either a code (1 to 4) or an operator string.
pub fn recompute(env: &mut HashMap<String, Value>) {
    let (Some(Value::Int(a)), Some(Value::Int(b)), Some(Value::Int(_))) =
        (env.get("valor1"), env.get("valor2"), env.get("resultado"))
    else {
        return;
    };

    let op = match env.get("operacao") {
        Some(Value::Int(code)) => code.to_string(),
        Some(Value::Str(op)) => op.clone(),
        _ => return,
    };

    if let Some(result) = apply(&op, *a, *b) {
        tracing::debug!(result, "legacy calculator recomputed resultado");
        env.insert("resultado".to_string(), Value::Int(result));
    }
}
