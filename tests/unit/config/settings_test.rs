// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置设置测试模块
///
/// 确保 config/default.toml 与环境变量能够正确叠加

#[cfg(test)]
mod tests {
    use analyzrs::config::settings::Settings;

    #[test]
    fn test_config_loading_from_default_toml() {
        std::env::set_var("ANALYZRS__WORKER__CONCURRENCY", "7");

        let settings = Settings::new().expect("configuration loads");

        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.database.max_connections, Some(20));
        assert_eq!(settings.worker.concurrency, 7);
        assert_eq!(settings.worker.max_attempts, 3);
        assert_eq!(settings.llm.model, "gpt-4o-mini");
        assert!(!settings.scanner.allow_private_targets);
        assert!(
            settings.worker.lease().num_seconds() as u64 > settings.worker.job_timeout_secs
        );

        std::env::remove_var("ANALYZRS__WORKER__CONCURRENCY");
    }
}
