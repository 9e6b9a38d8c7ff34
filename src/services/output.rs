use crate::domain::models::JsonOut;
use serde::Serialize;

fn emit_json<T: Serialize>(ok: bool, data: T) -> anyhow::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&JsonOut { ok, data })?
    );
    Ok(())
}

pub fn print_out<T: Serialize>(
    json: bool,
    data: &[T],
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        return emit_json(true, data);
    }
    if data.is_empty() {
        println!("(none)");
    }
    for d in data {
        println!("{}", row(d));
    }
    Ok(())
}

pub fn print_one<T: Serialize>(
    json: bool,
    data: T,
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    print_checked(json, true, data, row)
}

/// Like `print_one`, but `ok` reflects a check result (e.g. digest verify).
pub fn print_checked<T: Serialize>(
    json: bool,
    ok: bool,
    data: T,
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        return emit_json(ok, data);
    }
    println!("{}", row(&data));
    Ok(())
}
