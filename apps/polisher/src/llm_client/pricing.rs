//! Static price table and cost estimation.
//!
//! Lookup order is exact (provider, model) → provider default → free.
//! Estimates are for display only; they are never rounded here.

use super::Provider;

/// USD per one million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPricing {
    pub const FREE: ModelPricing = ModelPricing::new(0.0, 0.0);

    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }
}

struct ProviderPrices {
    models: &'static [(&'static str, ModelPricing)],
    default: Option<ModelPricing>,
}

const ANTHROPIC: ProviderPrices = ProviderPrices {
    models: &[
        ("claude-sonnet-4-5", ModelPricing::new(3.0, 15.0)),
        ("claude-3-5-sonnet-20241022", ModelPricing::new(3.0, 15.0)),
        ("claude-3-5-haiku-20241022", ModelPricing::new(1.0, 5.0)),
    ],
    default: None,
};

const OPENAI: ProviderPrices = ProviderPrices {
    models: &[
        ("gpt-4o", ModelPricing::new(2.5, 10.0)),
        ("gpt-4o-mini", ModelPricing::new(0.15, 0.6)),
        ("gpt-4-turbo", ModelPricing::new(10.0, 30.0)),
    ],
    default: None,
};

const XAI: ProviderPrices = ProviderPrices {
    models: &[
        ("grok-2", ModelPricing::new(3.0, 12.0)),
        ("grok-2-mini", ModelPricing::new(0.75, 3.0)),
        ("grok-beta", ModelPricing::new(3.0, 12.0)),
    ],
    default: None,
};

const ZHIPUAI: ProviderPrices = ProviderPrices {
    models: &[
        ("GLM-4.5-Flash", ModelPricing::new(0.10, 0.10)),
        ("GLM-4-Plus", ModelPricing::new(0.50, 0.50)),
        ("GLM-4", ModelPricing::new(1.0, 1.0)),
    ],
    default: None,
};

// Per-model pricing varies on OpenRouter; bill at a conservative flat rate.
const OPENROUTER: ProviderPrices = ProviderPrices {
    models: &[],
    default: Some(ModelPricing::new(3.0, 15.0)),
};

// Free tier, server-side quota, or unknown self-hosted pricing.
const NO_COST: ProviderPrices = ProviderPrices {
    models: &[],
    default: Some(ModelPricing::FREE),
};

fn provider_prices(provider: &Provider) -> Option<&'static ProviderPrices> {
    match provider {
        Provider::Anthropic => Some(&ANTHROPIC),
        Provider::OpenAi => Some(&OPENAI),
        Provider::Xai => Some(&XAI),
        Provider::ZhipuAi => Some(&ZHIPUAI),
        Provider::OpenRouter => Some(&OPENROUTER),
        Provider::Github | Provider::Mcp | Provider::Custom => Some(&NO_COST),
        Provider::Other(_) => None,
    }
}

/// Resolves the price entry for a provider/model pairing. Never fails.
pub fn lookup_pricing(provider: &Provider, model: &str) -> ModelPricing {
    let Some(prices) = provider_prices(provider) else {
        return ModelPricing::FREE;
    };

    prices
        .models
        .iter()
        .find(|(id, _)| *id == model)
        .map(|(_, pricing)| *pricing)
        .or(prices.default)
        .unwrap_or(ModelPricing::FREE)
}

/// Estimated USD cost of one or more completions.
pub fn calculate_cost(input_tokens: u64, output_tokens: u64, provider: &Provider, model: &str) -> f64 {
    let pricing = lookup_pricing(provider, model);
    (input_tokens as f64 / 1_000_000.0) * pricing.input_per_million
        + (output_tokens as f64 / 1_000_000.0) * pricing.output_per_million
}
