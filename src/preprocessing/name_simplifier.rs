//! Category name simplification
//!
//! Production company names carry boilerplate ("Pictures", "Inc.", "Film
//! Company") that splits one studio across several spellings. Stripping those
//! tokens lets frequency aggregation count them together.

use indexmap::IndexMap;

/// Boilerplate tokens stripped from production company names
pub const DEFAULT_NOISE_TOKENS: &[&str] = &[
    "Picture",
    "Image",
    "Animation",
    "Classic",
    "Vantage",
    "Film",
    "Production",
    "Entertainment",
    "Studio",
    "Inc.",
    "Inc",
    ", The",
    "L.P.",
    "Company",
];

/// Simplify a single name.
///
/// Every plural token (`token + "s"`) is removed first, then every bare token,
/// anywhere in the string. Surrounding whitespace is trimmed last.
pub fn simplify_name<S: AsRef<str>>(name: &str, noise_tokens: &[S]) -> String {
    let mut simplified = name.to_string();
    for token in noise_tokens {
        let plural = format!("{}s", token.as_ref());
        simplified = simplified.replace(&plural, "");
    }
    for token in noise_tokens {
        let token = token.as_ref();
        if !token.is_empty() {
            simplified = simplified.replace(token, "");
        }
    }
    simplified.trim().to_string()
}

/// Map every input name to its simplified form, keeping input order
pub fn simplify<I, N, S>(names: I, noise_tokens: &[S]) -> IndexMap<String, String>
where
    I: IntoIterator<Item = N>,
    N: AsRef<str>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| {
            let name = name.as_ref();
            (name.to_string(), simplify_name(name, noise_tokens))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strips_plural_then_singular() {
        assert_eq!(simplify_name("Universal Pictures", DEFAULT_NOISE_TOKENS), "Universal");
        assert_eq!(simplify_name("Walt Disney Picture", DEFAULT_NOISE_TOKENS), "Walt Disney");
        assert_eq!(simplify_name("Lionsgate Films", DEFAULT_NOISE_TOKENS), "Lionsgate");
    }

    #[test]
    fn test_strips_anywhere_in_the_name() {
        assert_eq!(
            simplify_name("Paramount Film Company", DEFAULT_NOISE_TOKENS),
            "Paramount"
        );
        assert_eq!(
            simplify_name("Weinstein Company, The", DEFAULT_NOISE_TOKENS),
            "Weinstein"
        );
        // pure substring removal, not word aware
        assert_eq!(simplify_name("Filmax", DEFAULT_NOISE_TOKENS), "ax");
    }

    #[test]
    fn test_inc_with_dot_before_bare_inc() {
        assert_eq!(simplify_name("Pixar Inc.", DEFAULT_NOISE_TOKENS), "Pixar");
        assert_eq!(simplify_name("Pixar Inc", DEFAULT_NOISE_TOKENS), "Pixar");
    }

    #[test]
    fn test_mapping_keeps_every_input() {
        let names = ["Universal Pictures", "Universal", "Columbia Pictures Corporation"];
        let table = simplify(names, DEFAULT_NOISE_TOKENS);
        assert_eq!(table.len(), 3);
        assert_eq!(table["Universal Pictures"], "Universal");
        assert_eq!(table["Universal"], "Universal");
        assert_eq!(table["Columbia Pictures Corporation"], "Columbia  Corporation");
    }

    #[test]
    fn test_custom_tokens() {
        let table = simplify(vec!["Acme Widgets Ltd"], &["Widget", "Ltd"]);
        assert_eq!(table["Acme Widgets Ltd"], "Acme");
    }

    #[test]
    fn test_already_simple_name_is_fixed_point() {
        let once = simplify_name("Warner Bros.", DEFAULT_NOISE_TOKENS);
        assert_eq!(once, "Warner Bros.");
        assert_eq!(simplify_name(&once, DEFAULT_NOISE_TOKENS), once);
    }

    proptest! {
        #[test]
        fn prop_idempotent_without_residual_tokens(name in "[A-Za-z .,]{0,30}") {
            let once = simplify_name(&name, DEFAULT_NOISE_TOKENS);
            let has_residual = DEFAULT_NOISE_TOKENS.iter().any(|t| once.contains(t));
            prop_assume!(!has_residual);
            prop_assert_eq!(simplify_name(&once, DEFAULT_NOISE_TOKENS), once);
        }
    }
}
