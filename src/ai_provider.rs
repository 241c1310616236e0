use clap::ValueEnum;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AiProvider {
    /// Anthropic Messages API (HTTP)
    Anthropic,
    /// ローカルの Claude CLI
    Claude,
}

impl AiProvider {
    pub fn name(&self) -> &'static str {
        match self {
            AiProvider::Anthropic => "anthropic",
            AiProvider::Claude => "claude",
        }
    }

    /// APIキーが必要か
    pub fn requires_api_key(&self) -> bool {
        matches!(self, AiProvider::Anthropic)
    }

    /// max_tokens / temperature を適用できるか（Claude CLIは指定不可）
    pub fn honors_generation_params(&self) -> bool {
        matches!(self, AiProvider::Anthropic)
    }
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
