use tracing::warn;

use super::Provider;

/// Hard server-side ceilings on requested output tokens.
/// Providers absent here are treated as uncapped.
const OUTPUT_TOKEN_CEILINGS: &[(Provider, u32)] = &[
    // GitHub Models free tier rejects anything above 4K output tokens.
    (Provider::Github, 4000),
];

pub fn output_token_ceiling(provider: &Provider) -> Option<u32> {
    OUTPUT_TOKEN_CEILINGS
        .iter()
        .find(|(p, _)| p == provider)
        .map(|(_, ceiling)| *ceiling)
}

/// Clamps `requested` to the provider's ceiling, if it has one.
pub fn clamp_max_tokens(provider: &Provider, requested: u32) -> u32 {
    match output_token_ceiling(provider) {
        Some(ceiling) if requested > ceiling => {
            warn!(
                "{} limits output to {} tokens; requested {}, using {}",
                provider, ceiling, requested, ceiling
            );
            ceiling
        }
        _ => requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_is_capped_at_4000() {
        assert_eq!(clamp_max_tokens(&Provider::Github, 16000), 4000);
    }

    #[test]
    fn test_below_ceiling_is_unchanged() {
        assert_eq!(clamp_max_tokens(&Provider::Github, 1000), 1000);
    }

    #[test]
    fn test_uncapped_provider_passes_through() {
        assert_eq!(clamp_max_tokens(&Provider::OpenRouter, 16000), 16000);
        assert_eq!(
            clamp_max_tokens(&Provider::Other("self-hosted".to_string()), 16000),
            16000
        );
    }
}
