//! Claude CLI連携
//!
//! CLIは複数ターンの会話を受け付けないため、ターン列をトランスクリプト形式の
//! 1つのプロンプトに展開して `claude -p` に渡す。トークン使用量は取得できない。
//!
//! プロンプトはリファレンス一覧を含み引数長の上限を超えうるため、標準入力から渡す。

use super::{Completion, CompletionService, GenerationParams, Usage};
use crate::error::{DensityAiError, Result};
use async_trait::async_trait;
use density_ai_common::{ConversationTurn, Role};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const DEFAULT_PROGRAM: &str = "claude";

/// Claude CLIクライアント
///
/// CLIには生成パラメータ（max_tokens / temperature）を指定できないため、
/// `GenerationParams` は適用されない。
pub struct ClaudeCliClient {
    program: String,
    model: Option<String>,
    verbose: bool,
}

impl ClaudeCliClient {
    pub fn new(model: Option<String>, verbose: bool) -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            model,
            verbose,
        }
    }

    /// 実行するプログラムを差し替え
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self) -> Command {
        // Windowsではcmd /c経由
        #[cfg(windows)]
        let mut command = {
            let mut c = Command::new("cmd");
            c.args(["/c", self.program.as_str()]);
            c
        };

        #[cfg(not(windows))]
        let mut command = Command::new(&self.program);

        command.args(["-p", "--output-format", "text"]);
        if let Some(model) = &self.model {
            command.args(["--model", model.as_str()]);
        }

        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // キャンセル時に子プロセスを終了させる
            .kill_on_drop(true);
        command
    }
}

/// ターン列をトランスクリプトに展開
///
/// 末尾がアシスタントのターン（プレフィル）の場合は、その続きを書くよう指示する
fn flatten_turns(turns: &[ConversationTurn]) -> String {
    let mut prompt = String::new();

    for turn in turns {
        let speaker = match turn.role {
            Role::User => "Human",
            Role::Assistant => "Assistant",
        };
        prompt.push_str(&format!("{}: {}\n\n", speaker, turn.text));
    }

    if let Some(last) = turns.last() {
        if last.role == Role::Assistant {
            prompt.push_str(&format!(
                "Continue the last Assistant message. Reply with only the text that follows \"{}\".",
                last.text
            ));
        } else {
            prompt.push_str("Reply as the Assistant with only your answer.");
        }
    }

    prompt
}

#[async_trait]
impl CompletionService for ClaudeCliClient {
    async fn invoke(&self, turns: &[ConversationTurn], _params: &GenerationParams) -> Result<Completion> {
        let prompt = flatten_turns(turns);

        let mut child = self
            .command()
            .spawn()
            .map_err(|e| DensityAiError::CliExecution(format!("Claude CLI実行エラー: {}", e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| DensityAiError::CliExecution("標準入力を取得できません".into()))?;
        let write_prompt = async move {
            stdin.write_all(prompt.as_bytes()).await?;
            stdin.shutdown().await
        };

        // 書き込みと出力の読み取りを並行させる（パイプ詰まり防止）
        let (written, output) = tokio::join!(write_prompt, child.wait_with_output());
        let output = output
            .map_err(|e| DensityAiError::CliExecution(format!("Claude CLI実行エラー: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DensityAiError::ApiCall(format!(
                "Claude CLI failed (code {:?}): {}",
                output.status.code(),
                stderr
            )));
        }
        written.map_err(|e| DensityAiError::CliExecution(format!("プロンプトの送信に失敗: {}", e)))?;

        let response = String::from_utf8_lossy(&output.stdout).to_string();

        if self.verbose {
            let preview: String = response.chars().take(500).collect();
            tracing::debug!(preview = %preview, "Claude CLI response");
        }

        Ok(Completion {
            text: response,
            usage: Usage::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use density_ai_common::Conversation;

    #[test]
    fn test_flatten_turns_with_priming() {
        let conversation = Conversation::start("BASE PROMPT", "caster sugar");
        let prompt = flatten_turns(conversation.turns());

        assert!(prompt.starts_with("Human: BASE PROMPT\n\n"));
        assert!(prompt.contains("Human: What is the best match for the ingredient: caster sugar?"));
        assert!(prompt.contains("Assistant: Confidence:"));
        assert!(prompt.ends_with("follows \"Confidence:\"."));
    }

    #[test]
    fn test_flatten_turns_ending_with_user() {
        let mut conversation = Conversation::start("BASE", "milk");
        conversation.push_user("Check again");
        let prompt = flatten_turns(conversation.turns());

        assert!(prompt.contains("Human: Check again"));
        assert!(prompt.ends_with("Reply as the Assistant with only your answer."));
    }

    #[test]
    fn test_flatten_turns_empty() {
        assert_eq!(flatten_turns(&[]), "");
    }

    /// 引数長の上限（128KiB）を超えるプロンプトも標準入力で渡せる
    #[cfg(unix)]
    #[tokio::test]
    async fn test_large_prompt_is_sent_via_stdin() {
        use density_ai_common::{build_base_prompt, ReferenceCatalog, ReferenceIngredient};
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("claude");
        std::fs::write(&script, "#!/bin/sh\nexec wc -c\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let entries = (0..4000)
            .map(|i| ReferenceIngredient {
                id: Some(i),
                ingredient: format!("reference ingredient number {}", i),
                normalised: format!("reference ingredient number {}", i),
                density: 1.0,
                source: "test".to_string(),
            })
            .collect();
        let base_prompt = build_base_prompt(&ReferenceCatalog::new(entries));
        let conversation = Conversation::start(&base_prompt, "caster sugar");
        let expected = flatten_turns(conversation.turns()).len();
        assert!(expected > 128 * 1024);

        let client = ClaudeCliClient::new(None, false).with_program(script.to_string_lossy());
        let completion = client
            .invoke(conversation.turns(), &GenerationParams::default())
            .await
            .unwrap();

        assert_eq!(completion.text.trim().parse::<usize>().unwrap(), expected);
        assert_eq!(completion.usage, Usage::default());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_exit_is_reported() {
        let client = ClaudeCliClient::new(None, false).with_program("false");
        let conversation = Conversation::start("BASE", "milk");
        let result = client.invoke(conversation.turns(), &GenerationParams::default()).await;
        assert!(matches!(result, Err(DensityAiError::ApiCall(_))));
    }
}
