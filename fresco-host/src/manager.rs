//! Central application lifecycle manager.
//!
//! Owns the process-wide registry of [`App`] records and drives each one
//! through created → loading → mounted → unmounted. Loading fans out into
//! two resource classes (stylesheet links, scripts) resolved concurrently;
//! the dual-completion gate lets mount proceed only when both classes have
//! arrived and no unmount slipped in mid-flight.
//!
//! Nothing in here surfaces an error across the custom-tag contract:
//! failures are contained and logged where they happen, and a failed
//! resource class leaves the application parked in `loading`.

use crate::app::App;
use crate::config::HostConfig;
use crate::error::HostError;
use crate::sandbox::Sandbox;
use crate::scoped_css;
use crate::source;
use fresco_platform::{
    DirectScope, Document, FetchError, HostGlobal, HttpFetcher, NodeId, ScriptRuntime,
    StyleTemplate, TextFetcher,
};
use fresco_types::{AppConfig, AppStatus};
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub struct AppHost {
    config: HostConfig,
    /// The shared rendering surface. Detached source trees live in the
    /// same arena as the mounted page.
    document: Arc<Mutex<Document>>,
    fetcher: Arc<dyn TextFetcher>,
    runtime: Arc<dyn ScriptRuntime>,
    global: Arc<dyn HostGlobal>,
    /// Process-wide registry: exactly one live record per application name.
    apps: Mutex<HashMap<String, Arc<Mutex<App>>>>,
    /// Scratch materializer shared by all scoping calls, used serially.
    style_template: Arc<Mutex<StyleTemplate>>,
}

impl AppHost {
    pub fn new(
        config: HostConfig,
        fetcher: Arc<dyn TextFetcher>,
        runtime: Arc<dyn ScriptRuntime>,
        global: Arc<dyn HostGlobal>,
    ) -> Self {
        Self {
            config,
            document: Arc::new(Mutex::new(Document::new())),
            fetcher,
            runtime,
            global,
            apps: Mutex::new(HashMap::new()),
            style_template: Arc::new(Mutex::new(StyleTemplate::new())),
        }
    }

    /// Builds a host over the HTTP transport, with the per-request timeout
    /// taken from `config`.
    pub fn with_http(
        config: HostConfig,
        runtime: Arc<dyn ScriptRuntime>,
        global: Arc<dyn HostGlobal>,
    ) -> Result<Self, FetchError> {
        let fetcher = Arc::new(HttpFetcher::new(config.fetch_timeout_ms)?);
        Ok(Self::new(config, fetcher, runtime, global))
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Handle to the shared rendering surface.
    pub fn document(&self) -> Arc<Mutex<Document>> {
        Arc::clone(&self.document)
    }

    // ================================================================
    // Registry access
    // ================================================================

    pub fn app(&self, name: &str) -> Result<Arc<Mutex<App>>, HostError> {
        self.apps
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| HostError::AppNotFound(name.to_string()))
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.apps.lock().unwrap().contains_key(name)
    }

    pub fn app_count(&self) -> usize {
        self.apps.lock().unwrap().len()
    }

    pub fn status(&self, name: &str) -> Option<AppStatus> {
        self.app(name).ok().map(|app| app.lock().unwrap().status)
    }

    // ================================================================
    // Connect / disconnect — the custom-tag contract entry points
    // ================================================================

    /// Begins hosting an application under the given mount point. A cached
    /// record remounts instantly from its stored source; otherwise a fresh
    /// record is created and the full load pipeline runs.
    pub async fn connect(&self, config: AppConfig, container: NodeId) {
        let existing = self.apps.lock().unwrap().get(&config.name).cloned();

        if let Some(app) = existing {
            let cached = {
                let mut app = app.lock().unwrap();
                app.container = Some(container);
                if app.source.html.is_some() {
                    app.status = AppStatus::Loading;
                    // Both classes resolved in the cached round.
                    app.load_count = 2;
                    true
                } else {
                    false
                }
            };
            if cached {
                info!(app = %config.name, "Remounting from cached source");
                self.mount(&app);
            } else {
                warn!(app = %config.name, "Reconnect while initial load incomplete");
            }
            return;
        }

        let sandbox = Sandbox::new(&config.name, Arc::clone(&self.global));
        let app = Arc::new(Mutex::new(App::new(config.clone(), sandbox, container)));
        app.lock().unwrap().status = AppStatus::Loading;
        self.apps
            .lock()
            .unwrap()
            .insert(config.name.clone(), Arc::clone(&app));
        info!(app = %config.name, url = %config.url, "Application created");

        if let Err(e) = self.load(app).await {
            warn!(app = %config.name, error = %e, "Markup load failed; no mount attempted");
            // A record without markup is useless: drop it so a later
            // connect retries the fetch from scratch.
            self.apps.lock().unwrap().remove(&config.name);
        }
    }

    /// Unmounts an application: best-effort and non-throwing, including
    /// for an application that never finished loading. With `destroy` the
    /// record and its cached source leave the registry for good.
    pub fn disconnect(&self, name: &str, destroy: bool) {
        let Ok(app) = self.app(name) else {
            debug!(error = %HostError::AppNotFound(name.to_string()), "Disconnect ignored");
            return;
        };

        {
            let mut app = app.lock().unwrap();
            app.status = AppStatus::Unmounted;
            app.container = None;
            app.sandbox.stop();
        }
        info!(app = %name, destroy, "Application unmounted");

        if destroy {
            if let Some(app) = self.apps.lock().unwrap().remove(name) {
                let mut app = app.lock().unwrap();
                if let Some(html) = app.source.html.take() {
                    self.document.lock().unwrap().drop_subtree(html);
                }
            }
        }
    }

    // ================================================================
    // Load pipeline
    // ================================================================

    async fn load(&self, app: Arc<Mutex<App>>) -> Result<(), HostError> {
        let (name, url) = {
            let app = app.lock().unwrap();
            (app.name.clone(), app.url.clone())
        };

        let markup = self
            .fetcher
            .fetch_text(&url)
            .await
            .map_err(|e| HostError::MarkupFetch {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        {
            let mut app = app.lock().unwrap();
            let mut doc = self.document.lock().unwrap();

            let root = doc.parse_fragment(&markup);
            if doc.children(root).iter().all(|c| doc.tag(*c).is_none()) {
                debug!(
                    app = %name,
                    error = %HostError::MalformedMarkup,
                    "Extraction degraded to an empty tree"
                );
            }
            source::rewrite_root_regions(&mut doc, root);
            let styles = source::extract_sources(&mut doc, root, &mut app);
            if self.config.scoped_css {
                for style in styles {
                    scoped_css::ensure_scoped(
                        &mut doc,
                        style,
                        &name,
                        Arc::clone(&self.style_template),
                    );
                }
            }
            app.source.html = Some(root);
        }

        let (links, scripts) =
            futures::join!(self.resolve_links(&app, &name), self.resolve_scripts(&app));
        for result in [links, scripts] {
            if let Err(e) = result {
                warn!(
                    app = %name,
                    error = %e,
                    "Resource class withheld; application stays loading"
                );
            }
        }
        Ok(())
    }

    /// Resolves every cataloged stylesheet link, in parallel, joined as one
    /// class. Results are written back by index against the entry list
    /// captured before fetching, and each resolved sheet becomes a scoped
    /// style node in the application's private head. One failure withholds
    /// the whole class and discards the round.
    async fn resolve_links(&self, app: &Arc<Mutex<App>>, name: &str) -> Result<(), HostError> {
        let urls: Vec<String> = {
            let app = app.lock().unwrap();
            app.source.links.keys().cloned().collect()
        };

        if !urls.is_empty() {
            let fetches = urls.iter().map(|url| self.fetcher.fetch_text(url));
            let bodies = try_join_all(fetches).await.map_err(resource_error)?;

            let mut app = app.lock().unwrap();
            let mut doc = self.document.lock().unwrap();
            let prefix = scoped_css::prefix_for(name);
            let head = app.source.html.map(|root| source::head_region(&mut doc, root));

            for (i, code) in bodies.into_iter().enumerate() {
                if let Some(head) = head {
                    let text = if self.config.scoped_css {
                        let mut template = self.style_template.lock().unwrap();
                        scoped_css::scope_stylesheet(&mut template, &code, &prefix)
                    } else {
                        code.clone()
                    };
                    let style = doc.create_element("style");
                    doc.set_text(style, text);
                    doc.append_child(head, style);
                }
                if let Some((_, entry)) = app.source.links.get_index_mut(i) {
                    entry.code = code;
                }
            }
        }

        self.complete_class(app);
        Ok(())
    }

    /// Resolves every cataloged script as one class: external sources are
    /// fetched in parallel, inline entries resolve immediately. Insertion
    /// order is preserved by index alignment regardless of completion
    /// order.
    async fn resolve_scripts(&self, app: &Arc<Mutex<App>>) -> Result<(), HostError> {
        let entries: Vec<(String, bool, String)> = {
            let app = app.lock().unwrap();
            app.source
                .scripts
                .iter()
                .map(|(key, entry)| (key.clone(), entry.is_external, entry.code.clone()))
                .collect()
        };

        if !entries.is_empty() {
            let fetches = entries.into_iter().map(|(key, is_external, code)| {
                let fetcher = Arc::clone(&self.fetcher);
                async move {
                    if is_external {
                        fetcher.fetch_text(&key).await
                    } else {
                        Ok(code)
                    }
                }
            });
            let bodies = try_join_all(fetches).await.map_err(resource_error)?;

            let mut app = app.lock().unwrap();
            for (i, code) in bodies.into_iter().enumerate() {
                if let Some((_, entry)) = app.source.scripts.get_index_mut(i) {
                    entry.code = code;
                }
            }
        }

        self.complete_class(app);
        Ok(())
    }

    /// The dual-completion gate's shared hook.
    fn complete_class(&self, app: &Arc<Mutex<App>>) {
        let should_mount = app.lock().unwrap().note_class_loaded();
        if should_mount {
            self.mount(app);
        }
    }

    // ================================================================
    // Mount
    // ================================================================

    /// Clones the resolved source tree, appends it under the container in
    /// one batch, activates the sandbox and executes every cataloged
    /// script in catalog insertion order.
    fn mount(&self, app: &Arc<Mutex<App>>) {
        let mut app = app.lock().unwrap();
        let Some(container) = app.container else {
            return;
        };
        let Some(html) = app.source.html else {
            return;
        };

        {
            let mut doc = self.document.lock().unwrap();
            if !doc.is_alive(container) {
                warn!(app = %app.name, "Mount point left the surface before mount");
                return;
            }
            let batch = doc.clone_subtree(html);
            doc.append_fragment(container, batch);
        }

        if self.config.sandbox {
            app.sandbox.start();
        }

        let scripts: Vec<(String, String)> = app
            .source
            .scripts
            .iter()
            .map(|(key, entry)| (key.clone(), entry.code.clone()))
            .collect();

        for (key, code) in scripts {
            let result = if self.config.sandbox {
                let wrapped = app.sandbox.bind_scope(&code);
                self.runtime.evaluate(&wrapped, &mut app.sandbox)
            } else {
                let mut scope = DirectScope::new(self.global.as_ref());
                self.runtime.evaluate(&code, &mut scope)
            };
            if let Err(e) = result {
                let err = HostError::ScriptEvaluation {
                    app: app.name.clone(),
                    reason: e.to_string(),
                };
                warn!(script = %key, error = %err, "Sub-application script failed");
            }
        }

        app.status = AppStatus::Mounted;
        info!(app = %app.name, "Application mounted");
    }
}

fn resource_error(e: FetchError) -> HostError {
    match e {
        FetchError::Request { url, reason } => HostError::ResourceFetch { url, reason },
        FetchError::Status { url, status } => HostError::ResourceFetch {
            url,
            reason: format!("status {status}"),
        },
    }
}
