use crate::error::{EmbedError, Result};
use std::collections::HashMap;
use std::process::Command;
use tracing::debug;

/// Переменные окружения, без которых X11-утилиты не находят дисплей
/// при запуске через sudo.
fn build_env_overrides() -> HashMap<String, String> {
    let mut env_vars = HashMap::new();

    if std::env::var("USER").unwrap_or_default() == "root" {
        if let Ok(sudo_user) = std::env::var("SUDO_USER") {
            if std::env::var_os("XAUTHORITY").is_none() {
                let xauthority = format!("/home/{}/.Xauthority", sudo_user);
                debug!("Подставляем XAUTHORITY для пользователя {}: {}", sudo_user, xauthority);
                env_vars.insert("XAUTHORITY".to_string(), xauthority);
            }
        }
    }

    if let Ok(display_var) = std::env::var("DISPLAY") {
        env_vars.insert("DISPLAY".to_string(), display_var);
    }

    env_vars
}

fn create_command(program: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args);

    // Подстановки строим на лету, без глобального кэша
    for (key, value) in build_env_overrides() {
        cmd.env(key, value);
    }

    cmd
}

/// Запустить внешнюю утилиту и вернуть её stdout.
pub fn run_tool(program: &str, args: &[&str]) -> Result<String> {
    let output = create_command(program, args).output().map_err(|e| {
        debug!("{} не найден или не работает: {}", program, e);
        EmbedError::Platform(format!("{} не найден: {}", program, e))
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("{} {:?} вернул ошибку: {}", program, args, stderr.trim());
        return Err(EmbedError::Platform(format!(
            "{} {} вернул ошибку: {}",
            program,
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Проверить, что утилита доступна и отвечает
pub fn tool_available(program: &str, args: &[&str]) -> bool {
    run_tool(program, args).is_ok()
}
