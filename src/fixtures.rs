#[cfg(test)]
pub mod test {
    use crate::flags::FlagSet;
    use crate::value::{float, int, string};
    use crate::{Declare, Section, Value};

    // -- The demo host's tree, declared two ways ---------------------------------

    #[derive(Section, Declare)]
    pub struct GlobalConfig {
        #[config(name = "provider", value = "openai", usage = "provider to use for suggestions")]
        pub provider: Value<String>,

        #[config(name = "loglevel", value = "off", usage = "log level")]
        pub loglevel: Value<String>,

        #[config(name = "openai")]
        pub openai: OpenAiConfig,
    }

    #[derive(Section, Declare)]
    pub struct OpenAiConfig {
        #[config(name = "apikey", usage = "openai api key")]
        pub apikey: Value<String>,

        #[config(
            name = "model",
            value = "text-davinci-002",
            usage = "openai model to use for completion"
        )]
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

    /// The same tree as `declare::<GlobalConfig>(flags, "")`, built by hand.
    pub fn global_config(flags: &FlagSet) -> GlobalConfig {
        GlobalConfig {
            provider: string("provider").with_flag(
                flags,
                "provider",
                None,
                "openai".into(),
                "provider to use for suggestions",
            ),
            loglevel: string("loglevel").with_flag(flags, "loglevel", None, "off".into(), "log level"),
            openai: OpenAiConfig {
                apikey: string("openai.apikey").with_flag(
                    flags,
                    "openai-apikey",
                    None,
                    String::new(),
                    "openai api key",
                ),
                model: string("openai.model").with_flag(
                    flags,
                    "openai-model",
                    None,
                    "text-davinci-002".into(),
                    "openai model to use for completion",
                ),
                temperature: float("openai.temperature").with_flag(
                    flags,
                    "openai-temperature",
                    None,
                    0.2,
                    "temperature",
                ),
                maxtokens: int("openai.maxtokens").with_flag(
                    flags,
                    "openai-maxtokens",
                    None,
                    100,
                    "max tokens",
                ),
                topp: float("openai.topp").with_flag(flags, "openai-topp", None, 1.0, "top p"),
                frequencypenalty: float("openai.frequencypenalty").with_flag(
                    flags,
                    "openai-frequencypenalty",
                    None,
                    0.0,
                    "frequency penalty",
                ),
                presencepenalty: float("openai.presencepenalty").with_flag(
                    flags,
                    "openai-presencepenalty",
                    None,
                    0.0,
                    "presence penalty",
                ),
            },
        }
    }

    #[test]
    fn hand_built_and_declared_trees_agree() {
        let by_hand = FlagSet::new("aai");
        let declared = FlagSet::new("aai");
        let a = global_config(&by_hand);
        let b: GlobalConfig = crate::declare(&declared, "");

        assert_eq!(crate::keys(&a).unwrap(), crate::keys(&b).unwrap());
        for name in ["provider", "loglevel", "openai-model", "openai-maxtokens", "openai-topp"] {
            assert_eq!(by_hand.lookup(name), declared.lookup(name), "flag --{name}");
        }
    }
}
