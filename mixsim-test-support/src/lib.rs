//! Shared test utilities used across mixsim crates.

pub mod fixtures {
    //! Ready-made configurations for tests that need a small, valid network.
    use mixsim_core::{SimulationConfig, SimulationConfigBuilder};

    /// Builds a valid configuration or panics with the validation error.
    ///
    /// # Panics
    /// Panics when `builder` describes an invalid configuration, which is a
    /// bug in the calling test.
    #[must_use]
    pub fn build(builder: SimulationConfigBuilder) -> SimulationConfig {
        match builder.build() {
            Ok(config) => config,
            Err(err) => panic!("test configuration must be valid: {err}"),
        }
    }

    /// A `layers`-deep network with `width` nodes per layer.
    ///
    /// # Examples
    /// ```
    /// use mixsim_test_support::fixtures::layered;
    ///
    /// let config = layered(4, 6, 1);
    /// assert_eq!(config.num_nodes(), 24);
    /// assert_eq!(config.nodes_per_layer(), 6);
    /// ```
    #[must_use]
    pub fn layered(layers: usize, width: usize, seed: u64) -> SimulationConfig {
        build(
            SimulationConfig::builder()
                .with_num_nodes(layers * width)
                .with_num_layers(layers)
                .with_seed(seed),
        )
    }

    /// The reference scenario: 100 nodes in 5 layers, 1000 packets and a 20%
    /// passive adversary.
    #[must_use]
    pub fn reference(seed: u64) -> SimulationConfig {
        build(
            SimulationConfig::builder()
                .with_num_nodes(100)
                .with_num_layers(5)
                .with_num_packets(1000)
                .with_adversary_coverage(0.2)
                .with_seed(seed),
        )
    }
}

pub mod tracing {
    //! Layer capturing spans and events so tests can assert on
    //! instrumentation.
    use std::collections::HashMap;
    use std::fmt;
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id, Record};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::registry::LookupSpan;

    /// A span that has closed, with the fields recorded over its lifetime.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SpanRecord {
        /// Span name from its metadata.
        pub name: String,
        /// Fields recorded on creation or later via `record`.
        pub fields: HashMap<String, String>,
    }

    /// An emitted event.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct EventRecord {
        /// Event level.
        pub level: Level,
        /// Event target.
        pub target: String,
        /// Structured fields, including `message`.
        pub fields: HashMap<String, String>,
    }

    impl EventRecord {
        /// The event's `message` field, if any.
        #[must_use]
        pub fn message(&self) -> Option<&str> {
            self.fields.get("message").map(String::as_str)
        }
    }

    #[derive(Default)]
    struct Recorded {
        spans: Vec<SpanRecord>,
        events: Vec<EventRecord>,
    }

    /// Recording layer installed during tests.
    ///
    /// # Examples
    /// ```
    /// use mixsim_test_support::tracing::RecordingLayer;
    ///
    /// let layer = RecordingLayer::default();
    /// layer.in_scope(|| tracing::info_span!("demo", answer = 42).in_scope(|| ()));
    /// let span = layer.span("demo").expect("span was recorded");
    /// assert_eq!(span.fields.get("answer"), Some(&"42".to_owned()));
    /// ```
    #[derive(Clone, Default)]
    pub struct RecordingLayer {
        recorded: Arc<Mutex<Recorded>>,
    }

    impl RecordingLayer {
        /// Runs `f` with a registry carrying this layer as the default
        /// subscriber and returns its result.
        pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
            let subscriber = tracing_subscriber::registry().with(self.clone());
            tracing::subscriber::with_default(subscriber, f)
        }

        /// Closed spans in completion order.
        #[must_use]
        pub fn spans(&self) -> Vec<SpanRecord> {
            self.lock().spans.clone()
        }

        /// Events in emission order.
        #[must_use]
        pub fn events(&self) -> Vec<EventRecord> {
            self.lock().events.clone()
        }

        /// The first closed span called `name`.
        #[must_use]
        pub fn span(&self, name: &str) -> Option<SpanRecord> {
            self.lock().spans.iter().find(|span| span.name == name).cloned()
        }

        /// Whether an event with `level` and `message` was emitted.
        #[must_use]
        pub fn has_event(&self, level: Level, message: &str) -> bool {
            self.lock()
                .events
                .iter()
                .any(|event| event.level == level && event.message() == Some(message))
        }

        fn lock(&self) -> MutexGuard<'_, Recorded> {
            self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    struct PendingSpan(SpanRecord);

    impl<S> Layer<S> for RecordingLayer
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
            let Some(span) = ctx.span(id) else {
                return;
            };
            let mut fields = HashMap::new();
            attrs.record(&mut FieldCollector(&mut fields));
            span.extensions_mut().insert(PendingSpan(SpanRecord {
                name: attrs.metadata().name().to_owned(),
                fields,
            }));
        }

        fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
            let Some(span) = ctx.span(id) else {
                return;
            };
            if let Some(pending) = span.extensions_mut().get_mut::<PendingSpan>() {
                values.record(&mut FieldCollector(&mut pending.0.fields));
            }
        }

        fn on_close(&self, id: Id, ctx: Context<'_, S>) {
            let Some(span) = ctx.span(&id) else {
                return;
            };
            let Some(PendingSpan(record)) = span.extensions_mut().remove::<PendingSpan>() else {
                return;
            };
            self.lock().spans.push(record);
        }

        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut fields = HashMap::new();
            event.record(&mut FieldCollector(&mut fields));
            let metadata = event.metadata();
            self.lock().events.push(EventRecord {
                level: *metadata.level(),
                target: metadata.target().to_owned(),
                fields,
            });
        }
    }

    struct FieldCollector<'a>(&'a mut HashMap<String, String>);

    impl Visit for FieldCollector<'_> {
        fn record_str(&mut self, field: &Field, value: &str) {
            self.0.insert(field.name().to_owned(), value.to_owned());
        }

        fn record_f64(&mut self, field: &Field, value: f64) {
            self.0.insert(field.name().to_owned(), value.to_string());
        }

        fn record_i64(&mut self, field: &Field, value: i64) {
            self.0.insert(field.name().to_owned(), value.to_string());
        }

        fn record_u64(&mut self, field: &Field, value: u64) {
            self.0.insert(field.name().to_owned(), value.to_string());
        }

        fn record_bool(&mut self, field: &Field, value: bool) {
            self.0.insert(field.name().to_owned(), value.to_string());
        }

        fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
            self.0.insert(field.name().to_owned(), value.to_string());
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.insert(field.name().to_owned(), format!("{value:?}"));
        }
    }
}
