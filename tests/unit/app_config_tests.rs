/*!
 * Tests for configuration loading and validation
 */

use anyhow::Result;
use rentura::app_config::{Config, FailurePolicy, OracleProvider};
use rentura::errors::AnalysisError;

use crate::common;

#[test]
fn test_fromFile_withPartialJson_shouldFillDefaults() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{
            "oracle": { "provider": "ollama" },
            "evaluation": { "failure_policy": "degrade" }
        }"#,
    )?;

    let config = Config::from_file(&path)?;

    assert_eq!(config.oracle.provider, OracleProvider::Ollama);
    assert_eq!(config.oracle.get_model(), "llama3.1");
    assert_eq!(config.oracle.get_endpoint(), "http://localhost:11434");
    assert_eq!(config.evaluation.failure_policy, FailurePolicy::Degrade);
    assert_eq!(config.evaluation.max_issues, 10);
    assert_eq!(config.acquisition.max_chars, 15_000);
    Ok(())
}

#[test]
fn test_writeToFile_thenFromFile_shouldKeepOverrides() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("conf.json");

    let mut config = Config::default();
    config.oracle.provider = OracleProvider::Anthropic;
    config.oracle.active_provider_config_mut().model = "claude-test".to_string();
    config.server.bind_address = "0.0.0.0:9000".to_string();
    config.write_to_file(&path)?;

    let loaded = Config::from_file(&path)?;
    assert_eq!(loaded.oracle.get_model(), "claude-test");
    assert_eq!(loaded.server.bind_address, "0.0.0.0:9000");
    Ok(())
}

#[test]
fn test_validate_withMissingKeyFile_shouldBeConfigurationError() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let questions = common::create_question_dir(dir.path(), &[("01_kaution", "Kaution?")])?;

    let mut config = common::test_config(&questions);
    config.oracle.provider = OracleProvider::OpenAI;
    config.oracle.active_provider_config_mut().api_key_file = Some(dir.path().join("RenameKey.txt"));

    match config.validate() {
        Err(AnalysisError::Configuration(message)) => assert!(message.contains("RenameKey.txt")),
        other => panic!("expected configuration error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_validate_withKeyFile_shouldTrimKey() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let questions = common::create_question_dir(dir.path(), &[("01_kaution", "Kaution?")])?;
    let key_path = common::create_test_file(dir.path(), "RenameKey.txt", "sk-test\n")?;

    let mut config = common::test_config(&questions);
    config.oracle.provider = OracleProvider::OpenAI;
    config.oracle.active_provider_config_mut().api_key_file = Some(key_path);

    assert!(config.validate().is_ok());
    assert_eq!(config.oracle.resolve_api_key()?, "sk-test");
    Ok(())
}

#[test]
fn test_validate_withMissingQuestionDir_shouldFail() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(&dir.path().join("does-not-exist"));

    assert!(matches!(config.validate(), Err(AnalysisError::Configuration(_))));
    Ok(())
}

#[test]
fn test_validate_withInvalidEndpoint_shouldFail() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let questions = common::create_question_dir(dir.path(), &[("01_kaution", "Kaution?")])?;

    let mut config = common::test_config(&questions);
    config.oracle.active_provider_config_mut().endpoint = "not a url".to_string();

    assert!(config.validate().is_err());
    Ok(())
}
