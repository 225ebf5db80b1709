mod default_provider_factory;

pub use default_provider_factory::DefaultProviderFactory;
