use std::collections::BTreeMap;
use tracing::{info, warn};

/// Library instrumentations enabled for a worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Instrumentation {
    /// Server spans around every HTTP request, with incoming trace context.
    pub http: bool,
    /// Client spans around every database statement.
    pub postgres: bool,
}

impl Instrumentation {
    pub fn any(&self) -> bool {
        self.http || self.postgres
    }
}

pub type Activation = fn(&mut Instrumentation);

fn instrument_http(instrumentation: &mut Instrumentation) {
    instrumentation.http = true;
}

fn instrument_postgres(instrumentation: &mut Instrumentation) {
    instrumentation.postgres = true;
}

/// Maps library names to their activation. Built once and only read
/// afterwards.
#[derive(Clone)]
pub struct InstrumentationRegistry {
    activations: BTreeMap<&'static str, Activation>,
}

impl std::fmt::Debug for InstrumentationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentationRegistry")
            .field("libraries", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for InstrumentationRegistry {
    fn default() -> Self {
        Self::new()
            .with("http", instrument_http)
            .with("wsgi", instrument_http)
            .with("postgres", instrument_postgres)
            .with("psycopg2", instrument_postgres)
    }
}

impl InstrumentationRegistry {
    pub fn new() -> Self {
        Self {
            activations: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &'static str, activation: Activation) -> Self {
        self.activations.insert(name, activation);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.activations.keys().copied()
    }

    /// Activates every known library in `libraries`. Unknown names are
    /// logged and skipped.
    pub fn instrument<S: AsRef<str>>(&self, libraries: &[S]) -> Instrumentation {
        let mut instrumentation = Instrumentation::default();
        for library in libraries {
            let library = library.as_ref();
            match self.activations.get(library) {
                Some(activate) => {
                    info!("Instrumenting library '{}'", library);
                    activate(&mut instrumentation);
                }
                None => warn!("Instrumentation for library '{}' not found", library),
            }
        }
        instrumentation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_known_libraries() {
        let registry = InstrumentationRegistry::default();
        let instrumentation = registry.instrument(&["wsgi", "psycopg2"]);
        assert_eq!(
            instrumentation,
            Instrumentation {
                http: true,
                postgres: true
            }
        );
    }

    #[test]
    fn test_unknown_library_is_skipped() {
        let registry = InstrumentationRegistry::default();
        let instrumentation = registry.instrument(&["redis", "postgres"]);
        assert!(!instrumentation.http);
        assert!(instrumentation.postgres);
    }

    #[test]
    fn test_empty_list_is_inert() {
        let registry = InstrumentationRegistry::default();
        let instrumentation = registry.instrument::<&str>(&[]);
        assert!(!instrumentation.any());
    }

    #[test]
    fn test_custom_registry() {
        let registry = InstrumentationRegistry::new().with("web", instrument_http);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["web"]);
        assert!(!registry.instrument(&["wsgi"]).http);
        assert!(registry.instrument(&["web"]).http);
    }
}
