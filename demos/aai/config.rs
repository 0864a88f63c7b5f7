use confbind::{Decode, Declare, Section, Value};
use serde::Serialize;

/// Everything `aai` reads from `config.toml` and its flags.
#[derive(Section, Declare)]
pub struct GlobalConfig {
    #[config(name = "provider", value = "openai", usage = "provider to use for suggestions")]
    pub provider: Value<String>,

    #[config(name = "loglevel", value = "off", usage = "log level (trace, debug, info, warn, error, off)")]
    pub loglevel: Value<String>,

    #[config(name = "openai")]
    pub openai: OpenAiConfig,
}

/// OpenAI completion settings.
/// See https://beta.openai.com/docs/api-reference/completions/create
#[derive(Section, Declare)]
pub struct OpenAiConfig {
    #[config(name = "apikey", usage = "openai api key")]
    pub apikey: Value<String>,

    #[config(name = "model", value = "text-davinci-002", usage = "openai model to use for completion")]
    pub model: Value<String>,

    #[config(name = "temperature", value = "0.2", usage = "temperature")]
    pub temperature: Value<f64>,

    #[config(name = "maxtokens", value = "100", usage = "max tokens")]
    pub maxtokens: Value<i64>,

    #[config(name = "topp", value = "1.0", usage = "top p")]
    pub topp: Value<f64>,

    #[config(name = "frequencypenalty", value = "0.0", usage = "frequency penalty")]
    pub frequencypenalty: Value<f64>,

    #[config(name = "presencepenalty", value = "0.0", usage = "presence penalty")]
    pub presencepenalty: Value<f64>,
}

/// Shared part of every completion request body.
#[derive(Decode, Serialize, Default, Debug, Clone, PartialEq)]
pub struct RequestBase {
    #[config(key = "openai.model")]
    pub model: String,
    #[config(key = "openai.temperature")]
    pub temperature: f64,
    #[config(key = "openai.maxtokens")]
    pub max_tokens: u32,
    #[config(key = "openai.topp")]
    pub top_p: f64,
    #[config(key = "openai.frequencypenalty")]
    pub frequency_penalty: f64,
    #[config(key = "openai.presencepenalty")]
    pub presence_penalty: f64,
}

/// What the OpenAI client needs, decoded from [`GlobalConfig`].
#[derive(Decode, Default, Debug)]
pub struct OpenAiSettings {
    #[config(key = "openai.apikey")]
    pub api_key: String,
    #[config(squash)]
    pub request: RequestBase,
}

/// Sequence that prefixes each query in the prompt and stops the completion.
const QUERY_PREFIX: &str = "command-query";

#[derive(Serialize, Debug)]
pub struct CompletionRequest {
    #[serde(flatten)]
    pub base: RequestBase,
    pub prompt: String,
    pub stop: Vec<String>,
}

impl CompletionRequest {
    pub fn suggest(base: RequestBase, query: &str) -> Self {
        let prompt = format!(
            "{}\nmkdir foo\n{}\n",
            query_line("create foo directory"),
            query_line(query)
        );
        Self {
            base,
            prompt,
            stop: vec![QUERY_PREFIX.to_string()],
        }
    }

    pub fn explain(base: RequestBase, command: &str) -> Self {
        let prompt = format!(
            "Explain what the following shell command does.\n{QUERY_PREFIX}: {command}\nExplanation:"
        );
        Self {
            base,
            prompt,
            stop: vec![QUERY_PREFIX.to_string()],
        }
    }
}

fn query_line(query: &str) -> String {
    format!("{QUERY_PREFIX}: {query}:")
}
