//! Fuzz target for override directive parsing and precedence.
//!
//! Any token must either parse to a granularity or fail with
//! `UnrecognizedGranularity`; parsing must agree with normalization.

#![no_main]

use arbitrary::Arbitrary;
use gran_common::Granularity;
use gran_config::{normalize_token, parse_directive, resolve_override, ConfigError, Settings};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    cli: Option<String>,
    env: Option<String>,
    file: Option<String>,
}

fuzz_target!(|input: Input| {
    for token in [&input.cli, &input.env, &input.file].into_iter().flatten() {
        match parse_directive(Some(token.as_str())) {
            Ok(None) => assert!(token.is_empty()),
            Ok(Some(g)) => {
                let expected = match g {
                    Granularity::Byte => "byte",
                    Granularity::CacheLine => "cacheline",
                    Granularity::Page => "page",
                };
                assert_eq!(normalize_token(token), expected);
            }
            Err(ConfigError::UnrecognizedGranularity { token: raw }) => assert_eq!(&raw, token),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    let settings = Settings {
        force_granularity: input.file.clone(),
        ..Settings::default()
    };
    if let Some(directive) =
        resolve_override(input.cli.as_deref(), input.env.as_deref(), &settings)
    {
        assert!(!directive.token.is_empty());
    }
});
