use chrono::{DateTime, Local};

fn build_datetime() -> DateTime<Local> {
    let build_timestamp: i64 = env!("BUILD_TIME").parse().unwrap_or(0);
    DateTime::from_timestamp(build_timestamp, 0)
        .map(|utc| utc.with_timezone(&Local))
        .unwrap_or_else(Local::now)
}

/// Long `--version` text.
pub fn get_version_info() -> &'static str {
    let build_time_str = build_datetime().format("%Y-%m-%d %H:%M:%S %Z").to_string();
    Box::leak(
        format!(
            "{} {}\n\
         Build Time: {}\n\
         Git Commit: {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            build_time_str,
            env!("GIT_COMMIT_HASH"),
        )
        .into_boxed_str(),
    )
}

/// Banner sent in the `User-Agent` header of every command response.
pub fn get_useragent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_useragent() {
        let ua = get_useragent();
        assert!(ua.starts_with("rtserver/"));
        assert!(ua.ends_with(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_version_info() {
        let info = get_version_info();
        assert!(info.contains("Build Time:"));
        assert!(info.contains("Git Commit:"));
    }
}
