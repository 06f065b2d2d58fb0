use std::io::Write;

use serde::Serialize;

use marginalia::application::error::AppError;
use marginalia::infra::error::InfraError;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_json(&mut out, value)
}

pub fn write_json<W, T>(out: &mut W, value: &T) -> Result<(), AppError>
where
    W: Write,
    T: Serialize + ?Sized,
{
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    writeln!(out, "{text}").map_err(InfraError::from)?;
    Ok(())
}
