use shroud::cli::app::{parse_args, Parsed};
use shroud::cli::args::{Args, Command};
use shroud::cli::{execute, ConsoleWriter};
use shroud::core::context::resolve_home;
use shroud::core::normalize::normalize_generate;
use shroud::{BuildEngine, Context, NormalizedOptions, OptionValue, ShroudError, ShroudResult};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Integration tests driving the pipeline through the library
#[cfg(test)]
mod integration_tests {
    use super::*;

    #[derive(Default)]
    struct RecordingEngine {
        calls: Vec<String>,
    }

    impl BuildEngine for RecordingEngine {
        fn generate_runtime_key(&mut self, _ctx: &Context, name: &str) -> ShroudResult<Vec<u8>> {
            self.calls.push(format!("key {}", name));
            Ok(b"key".to_vec())
        }

        fn generate_runtime(&mut self, _ctx: &Context, _output: &Path) -> ShroudResult<Vec<u8>> {
            self.calls.push("runtime".to_string());
            Ok(b"runtime".to_vec())
        }

        fn process(
            &mut self,
            _ctx: &Context,
            _options: &NormalizedOptions,
            _pack: Option<&str>,
        ) -> ShroudResult<()> {
            self.calls.push("process".to_string());
            Ok(())
        }
    }

    fn parse(argv: &[&str]) -> Args {
        match parse_args(std::iter::once("shroud").chain(argv.iter().copied())) {
            Ok(Parsed::Args(args)) => args,
            other => panic!("unexpected parse result {:?}", other),
        }
    }

    fn normalized(argv: &[&str]) -> NormalizedOptions {
        match parse(argv).command {
            Some(Command::Generate(args)) => normalize_generate(&args),
            other => panic!("expected generate, got {:?}", other),
        }
    }

    fn run(dir: &Path, argv: &[&str], engine: &mut RecordingEngine) -> ShroudResult<String> {
        let mut ctx = Context::new(dir.join("home"), dir);
        let mut writer = ConsoleWriter::new(Vec::new());
        execute(parse(argv), &mut ctx, engine, &mut writer)?;
        Ok(String::from_utf8(writer.into_inner()).unwrap())
    }

    #[test]
    fn test_only_supplied_flags_are_normalized() {
        let options = normalized(&["gen", "--mix-str", "--obf-code", "0", "foo.py"]);
        let keys: Vec<&str> = options.keys().collect();
        assert_eq!(keys, vec!["inputs", "mix_str", "obf_code"]);
        assert_eq!(options.get("obf_code"), Some(&OptionValue::Int(0)));
    }

    #[test]
    fn test_restrict_levels() {
        let options = normalized(&["gen", "--restrict", "2", "foo.py"]);
        assert!(options.flag("mix_name"));

        let options = normalized(&["gen", "--restrict", "1", "foo.py"]);
        assert!(!options.contains("mix_name"));
    }

    #[test]
    fn test_enable_two_features() {
        let options = normalized(&["gen", "--enable", "jit", "--enable", "rft", "foo.py"]);
        assert!(options.flag("enable_jit"));
        assert!(options.flag("enable_rft"));
        assert!(!options.contains("enable_bcc"));
    }

    #[test]
    fn test_no_runtime_without_outer_never_invokes_engine() {
        let dir = TempDir::new().unwrap();
        let mut engine = RecordingEngine::default();

        let err = run(dir.path(), &["gen", "--no-runtime", "foo.py"], &mut engine).unwrap_err();
        assert!(matches!(err, ShroudError::Usage(_)));
        assert!(engine.calls.is_empty());
    }

    #[test]
    fn test_outer_directory_needs_key_artifact() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("keys")).unwrap();
        let mut engine = RecordingEngine::default();
        let argv = ["gen", "--outer", "keys", "--no-runtime", "foo.py"];

        let err = run(dir.path(), &argv, &mut engine).unwrap_err();
        assert!(err.to_string().contains("no runtime key in"));
        assert!(engine.calls.is_empty());

        fs::write(dir.path().join("keys").join("shroud.rkey"), b"key").unwrap();
        run(dir.path(), &argv, &mut engine).unwrap();
        assert_eq!(engine.calls, vec!["process"]);
    }

    #[test]
    fn test_key_surplus_tokens_are_listed() {
        let dir = TempDir::new().unwrap();
        let mut engine = RecordingEngine::default();

        let err = run(dir.path(), &["gen", "key", "one", "two"], &mut engine).unwrap_err();
        assert_eq!(err.to_string(), "too many args [\"one\", \"two\"]");
        assert!(engine.calls.is_empty());

        run(dir.path(), &["gen", "key"], &mut engine).unwrap();
        assert_eq!(engine.calls, vec!["key shroud.rkey"]);
    }

    #[test]
    fn test_configured_outer_keyname_is_default_key_name() {
        let dir = TempDir::new().unwrap();
        let mut engine = RecordingEngine::default();

        run(dir.path(), &["cfg", "runtime", "outer_keyname=team.rkey"], &mut engine).unwrap();
        run(dir.path(), &["gen", "key"], &mut engine).unwrap();
        assert_eq!(engine.calls, vec!["key team.rkey"]);
        assert!(dir.path().join("dist").join("team.rkey").exists());
    }

    #[test]
    fn test_windows_feature_for_other_platform() {
        let dir = TempDir::new().unwrap();
        let mut engine = RecordingEngine::default();

        let err = run(
            dir.path(),
            &["gen", "--enable", "themida", "--platform", "linux.x86_64", "foo.py"],
            &mut engine,
        )
        .unwrap_err();
        assert!(err.to_string().contains("only works for Windows"));

        run(
            dir.path(),
            &["gen", "--enable", "themida", "--platform", "windows.x86_64", "foo.py"],
            &mut engine,
        )
        .unwrap();
        assert_eq!(engine.calls, vec!["process"]);
    }

    #[test]
    fn test_configure_views() {
        let dir = TempDir::new().unwrap();
        let mut engine = RecordingEngine::default();

        let output = run(dir.path(), &["cfg"], &mut engine).unwrap();
        assert!(output.contains("builder"));
        assert!(output.contains("runtime"));

        let output = run(dir.path(), &["cfg", "runtime", "keyfile"], &mut engine).unwrap();
        assert!(output.contains("shroud.rkey"));

        run(dir.path(), &["cfg", "builder", "mix_str=1"], &mut engine).unwrap();
        run(dir.path(), &["cfg", "-r", "builder"], &mut engine).unwrap();
        let output = run(dir.path(), &["cfg", "builder", "mix_str"], &mut engine).unwrap();
        assert!(output.contains("(unset)"));
    }

    #[test]
    fn test_home_resolution_order() {
        let workdir = Path::new("/work");
        assert_eq!(
            resolve_home(Some("/a"), Some("/b"), workdir).unwrap(),
            Path::new("/a")
        );
        assert_eq!(resolve_home(None, Some("/b"), workdir).unwrap(), Path::new("/b"));
        assert_eq!(
            resolve_home(None, Some("rel"), workdir).unwrap(),
            Path::new("/work/rel")
        );
    }
}
