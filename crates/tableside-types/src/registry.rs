//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Every gateway implementation module provides a `Registry` struct that
/// declares the name used for it in configuration files and hands out its
/// factory function.
pub trait ImplementationRegistry {
	/// Key under `[gateway.implementations.<NAME>]`, e.g. "http" or "memory".
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
