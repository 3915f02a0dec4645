//! Options normalizer for the generate command.
//!
//! Copies every supplied flag into [`NormalizedOptions`] under its canonical
//! name, then applies the derived rules in a fixed order. Each rule may
//! overwrite what an earlier step wrote:
//!
//! 1. restrict level above 1 forces `mix_name`
//! 2. each `--enable FEATURE` sets `enable_<feature>`
//! 3. `--relative PREFIX` replaces the `-i` shorthand
//! 4. `--no-wrap` sets `wrap_mode` to 0
//! 5. include/exclude patterns are joined with spaces

use crate::cli::args::GenerateArgs;
use crate::domain::options::{Feature, NormalizedOptions, OptionValue};

/// Canonical keys copied straight from the command line when supplied
pub const ALLOWED_KEYS: [&str; 22] = [
    "recursive",
    "findall",
    "inputs",
    "output",
    "no_runtime",
    "enable_bcc",
    "enable_jit",
    "enable_rft",
    "enable_themida",
    "obf_module",
    "obf_code",
    "assert_import",
    "assert_call",
    "mix_name",
    "mix_str",
    "relative_import",
    "restrict_module",
    "platforms",
    "outer",
    "period",
    "expired",
    "devices",
];

/// Build the canonical request for `generate`
pub fn normalize_generate(args: &GenerateArgs) -> NormalizedOptions {
    let mut options = NormalizedOptions::new();
    for key in ALLOWED_KEYS {
        if let Some(value) = supplied_value(args, key) {
            options.insert(key, value);
        }
    }

    if args.restrict_module.unwrap_or(0) > 1 {
        options.insert("mix_name", OptionValue::Flag(true));
    }

    for feature in &args.enables {
        let feature = Feature::from(*feature);
        options.insert(feature.option_key(), OptionValue::Flag(true));
    }

    if let Some(prefix) = &args.relative {
        options.insert("relative_import", OptionValue::Text(prefix.clone()));
    }

    if args.no_wrap {
        options.insert("wrap_mode", OptionValue::Int(0));
    }

    if !args.includes.is_empty() {
        options.insert("includes", OptionValue::Text(args.includes.join(" ")));
    }
    if !args.excludes.is_empty() {
        options.insert("excludes", OptionValue::Text(args.excludes.join(" ")));
    }

    options
}

/// The value of an allow-listed flag, or `None` when it was not supplied
fn supplied_value(args: &GenerateArgs, key: &str) -> Option<OptionValue> {
    let switch = |on: bool| on.then_some(OptionValue::Flag(true));
    let list = |values: &[String]| {
        (!values.is_empty()).then(|| OptionValue::List(values.to_vec()))
    };
    let text = |value: &Option<String>| value.clone().map(OptionValue::Text);

    match key {
        "recursive" => switch(args.recursive),
        "findall" => switch(args.findall),
        "inputs" => list(&args.inputs),
        "output" => text(&args.output),
        "no_runtime" => switch(args.no_runtime),
        "enable_bcc" => switch(args.enable_bcc),
        "enable_jit" => switch(args.enable_jit),
        "enable_rft" => switch(args.enable_rft),
        "enable_themida" => switch(args.enable_themida),
        "obf_module" => args.obf_module.map(|v| OptionValue::Int(i64::from(v))),
        "obf_code" => args.obf_code.map(|v| OptionValue::Int(i64::from(v))),
        "assert_import" => switch(args.assert_import),
        "assert_call" => switch(args.assert_call),
        "mix_name" => switch(args.mix_name),
        "mix_str" => switch(args.mix_str),
        "relative_import" => args.relative_import.then_some(OptionValue::Int(1)),
        "restrict_module" => args.restrict_module.map(|v| OptionValue::Int(i64::from(v))),
        "platforms" => list(&args.platforms),
        "outer" => text(&args.outer),
        "period" => args.period.map(|v| OptionValue::Int(i64::from(v))),
        "expired" => text(&args.expired),
        "devices" => list(&args.devices),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::FeatureArg;
    use proptest::prelude::*;

    fn with_inputs(args: GenerateArgs) -> GenerateArgs {
        GenerateArgs {
            inputs: vec!["foo.py".to_string()],
            ..args
        }
    }

    #[test]
    fn test_only_supplied_flags_appear() {
        let options = normalize_generate(&with_inputs(GenerateArgs {
            mix_str: true,
            obf_code: Some(0),
            ..Default::default()
        }));

        let keys: Vec<&str> = options.keys().collect();
        assert_eq!(keys, vec!["inputs", "mix_str", "obf_code"]);
        assert_eq!(options.get("obf_code"), Some(&OptionValue::Int(0)));
    }

    #[test]
    fn test_interp_and_hook_are_not_forwarded() {
        let options = normalize_generate(&with_inputs(GenerateArgs {
            bind_interp: Some("/usr/bin/python3".to_string()),
            hook: Some("h.py".to_string()),
            ..Default::default()
        }));

        let keys: Vec<&str> = options.keys().collect();
        assert_eq!(keys, vec!["inputs"]);
    }

    #[test]
    fn test_restrict_two_forces_mix_name() {
        let options = normalize_generate(&with_inputs(GenerateArgs {
            restrict_module: Some(2),
            ..Default::default()
        }));
        assert_eq!(options.get("mix_name"), Some(&OptionValue::Flag(true)));
    }

    #[test]
    fn test_restrict_one_leaves_mix_name_alone() {
        let options = normalize_generate(&with_inputs(GenerateArgs {
            restrict_module: Some(1),
            ..Default::default()
        }));
        assert!(!options.contains("mix_name"));
        assert_eq!(options.get("restrict_module"), Some(&OptionValue::Int(1)));
    }

    #[test]
    fn test_enable_sets_each_feature() {
        let options = normalize_generate(&with_inputs(GenerateArgs {
            enables: vec![FeatureArg::Jit, FeatureArg::Rft],
            ..Default::default()
        }));
        assert!(options.flag("enable_jit"));
        assert!(options.flag("enable_rft"));
        assert!(!options.contains("enable_bcc"));
    }

    #[test]
    fn test_relative_prefix_overrides_shorthand() {
        let options = normalize_generate(&with_inputs(GenerateArgs {
            relative_import: true,
            relative: Some("vendor".to_string()),
            ..Default::default()
        }));
        assert_eq!(options.text("relative_import"), Some("vendor"));

        let options = normalize_generate(&with_inputs(GenerateArgs {
            relative_import: true,
            ..Default::default()
        }));
        assert_eq!(options.get("relative_import"), Some(&OptionValue::Int(1)));
    }

    #[test]
    fn test_no_wrap_and_patterns() {
        let options = normalize_generate(&with_inputs(GenerateArgs {
            no_wrap: true,
            includes: vec!["*.py".to_string(), "lib/*.py".to_string()],
            excludes: vec!["test_*".to_string()],
            ..Default::default()
        }));
        assert_eq!(options.get("wrap_mode"), Some(&OptionValue::Int(0)));
        assert!(!options.contains("no_wrap"));
        assert_eq!(options.text("includes"), Some("*.py lib/*.py"));
        assert_eq!(options.text("excludes"), Some("test_*"));
    }

    fn feature_strategy() -> impl Strategy<Value = FeatureArg> {
        prop_oneof![
            Just(FeatureArg::Jit),
            Just(FeatureArg::Bcc),
            Just(FeatureArg::Rft),
            Just(FeatureArg::Themida),
        ]
    }

    proptest! {
        #[test]
        fn prop_switches_map_one_to_one(
            recursive in any::<bool>(),
            mix_str in any::<bool>(),
            assert_call in any::<bool>(),
            no_runtime in any::<bool>(),
            obf_module in proptest::option::of(0u8..=1),
            period in proptest::option::of(1u32..1000)
        ) {
            let options = normalize_generate(&with_inputs(GenerateArgs {
                recursive,
                mix_str,
                assert_call,
                no_runtime,
                obf_module,
                period,
                ..Default::default()
            }));

            prop_assert_eq!(options.contains("recursive"), recursive);
            prop_assert_eq!(options.contains("mix_str"), mix_str);
            prop_assert_eq!(options.contains("assert_call"), assert_call);
            prop_assert_eq!(options.contains("no_runtime"), no_runtime);
            prop_assert_eq!(options.contains("obf_module"), obf_module.is_some());
            prop_assert_eq!(options.contains("period"), period.is_some());

            let expected = 1 + [recursive, mix_str, assert_call, no_runtime].iter().filter(|b| **b).count()
                + usize::from(obf_module.is_some())
                + usize::from(period.is_some());
            prop_assert_eq!(options.len(), expected);
        }

        #[test]
        fn prop_restrict_level_and_mix_name(restrict in 0u8..=2, mix_name in any::<bool>()) {
            let options = normalize_generate(&with_inputs(GenerateArgs {
                restrict_module: Some(restrict),
                mix_name,
                ..Default::default()
            }));

            if restrict == 2 {
                prop_assert!(options.flag("mix_name"));
            } else {
                prop_assert_eq!(options.contains("mix_name"), mix_name);
            }
        }

        #[test]
        fn prop_enabled_features_are_set(features in proptest::collection::vec(feature_strategy(), 0..6)) {
            let options = normalize_generate(&with_inputs(GenerateArgs {
                enables: features.clone(),
                ..Default::default()
            }));

            for feature in features {
                prop_assert!(options.flag(Feature::from(feature).option_key()));
            }
        }
    }
}
