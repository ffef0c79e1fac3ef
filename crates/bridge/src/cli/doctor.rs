//! `assistant-bridge doctor`: pre-flight checks.
//!
//! Every check runs even after an earlier one fails, so one invocation
//! reports everything that is wrong.

use ab_assistants::auth::{mask_key, resolve_api_key};
use ab_assistants::{AssistantsApi, RestAssistantsClient};
use ab_domain::config::{Config, ConfigSeverity};

/// Returns `true` when every check passed.
pub async fn run(config: &Config, config_path: &str) -> anyhow::Result<bool> {
    println!("assistant-bridge doctor");
    println!();

    let mut all_passed = true;

    check_config_file(config_path);
    check_config_valid(config, &mut all_passed);
    let key = check_api_key(config, &mut all_passed);
    check_state_dir(config, &mut all_passed);
    if let Some(key) = key {
        check_api_reachable(config, key, &mut all_passed).await;
    } else {
        print_check("Assistants API reachable", false, "skipped (no API key)".into());
    }

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed.");
    }
    Ok(all_passed)
}

fn check_config_file(config_path: &str) {
    let exists = std::path::Path::new(config_path).exists();
    // Defaults are usable, so a missing file is reported but not fatal.
    print_check(
        "Config file",
        true,
        if exists {
            config_path.to_owned()
        } else {
            format!("{config_path} (not found, using defaults)")
        },
    );
}

fn check_config_valid(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    let warnings = issues.len() - errors;

    print_check(
        "Config valid",
        errors == 0,
        format!("{errors} error(s), {warnings} warning(s)"),
    );
    for issue in &issues {
        println!("         {issue}");
    }
    if errors > 0 {
        *all_passed = false;
    }
}

fn check_api_key(config: &Config, all_passed: &mut bool) -> Option<String> {
    match resolve_api_key(&config.api.auth) {
        Ok(key) => {
            print_check("API key", true, mask_key(&key));
            Some(key)
        }
        Err(e) => {
            print_check("API key", false, e.to_string());
            *all_passed = false;
            None
        }
    }
}

fn check_state_dir(config: &Config, all_passed: &mut bool) {
    let path = config.threads.state_path.join("threads");
    let writable = std::fs::create_dir_all(&path).is_ok() && {
        let marker = path.join(".assistant_bridge_doctor_write_check");
        let ok = std::fs::write(&marker, b"ok").is_ok();
        let _ = std::fs::remove_file(&marker);
        ok
    };

    print_check(
        "Thread state directory",
        writable,
        if writable {
            format!("{} (writable)", path.display())
        } else {
            format!("{} (not writable)", path.display())
        },
    );
    if !writable {
        *all_passed = false;
    }
}

async fn check_api_reachable(config: &Config, key: String, all_passed: &mut bool) {
    let client = match RestAssistantsClient::with_key(&config.api, key) {
        Ok(c) => c,
        Err(e) => {
            print_check("Assistants API reachable", false, e.to_string());
            *all_passed = false;
            return;
        }
    };

    match client.list_assistants().await {
        Ok(assistants) => {
            print_check(
                "Assistants API reachable",
                true,
                format!("{} ({} assistant(s))", config.api.base_url, assistants.len()),
            );

            let wanted = &config.assistant;
            match wanted.id.as_deref().filter(|id| !id.is_empty()) {
                Some(id) => {
                    let found = assistants.iter().any(|a| a.id == id);
                    print_check(
                        "Assistant present",
                        found,
                        if found { id.to_owned() } else { format!("{id} (not found)") },
                    );
                    if !found {
                        *all_passed = false;
                    }
                }
                None => {
                    let existing = assistants
                        .iter()
                        .find(|a| a.name.as_deref() == Some(wanted.name.as_str()));
                    print_check(
                        "Assistant present",
                        true,
                        match existing {
                            Some(a) => format!("{} ({})", wanted.name, a.id),
                            None => format!("{} (will be created on first use)", wanted.name),
                        },
                    );
                }
            }
        }
        Err(e) => {
            print_check(
                "Assistants API reachable",
                false,
                format!("{} ({e})", config.api.base_url),
            );
            *all_passed = false;
        }
    }
}

// ── Formatting helper ─────────────────────────────────────────────────

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}
