//! The request orchestrator.
//!
//! For each request the executor resolves the endpoint, runs the selected
//! pipeline step by step against a fresh [`Response`], and finalizes any
//! redirect. Steps run strictly in order: later steps read what earlier ones
//! grafted through the `current` resolver.

use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{Instrument, debug, error, info, trace, warn};

use gantry_commands::sql::Connections;
use gantry_commands::{CommandConfig, CommandFactory, CommandReturn};
use gantry_core::definition::{ApiDefinition, ApiPoint, EpDefinition, Selector, Step};
use gantry_core::error::{Exception, Result};
use gantry_core::inputs::{Inputs, Scope};
use gantry_core::request::Request;
use gantry_core::response::{Cookie, Response, Uri};
use gantry_core::value::{is_truthy, to_text};

/// Runs pipelines for incoming requests.
///
/// Cheap to clone; all definitions and registries are shared.
#[derive(Debug, Clone)]
pub struct Executor {
    api: Arc<ApiDefinition>,
    pipelines: Arc<EpDefinition>,
    inputs: Arc<Inputs>,
    commands: Arc<CommandFactory>,
    connections: Arc<Connections>,
}

impl Executor {
    /// Create an executor with default inputs, built-in commands and no
    /// SQL connections.
    pub fn new(api: ApiDefinition, pipelines: EpDefinition) -> Self {
        Self {
            api: Arc::new(api),
            pipelines: Arc::new(pipelines),
            inputs: Arc::new(Inputs::default()),
            commands: Arc::new(CommandFactory::new()),
            connections: Arc::new(Connections::new()),
        }
    }

    /// Use a configured expression evaluator.
    pub fn with_inputs(mut self, inputs: Inputs) -> Self {
        self.inputs = Arc::new(inputs);
        self
    }

    /// Use a command factory with custom providers.
    pub fn with_commands(mut self, commands: CommandFactory) -> Self {
        self.commands = Arc::new(commands);
        self
    }

    /// Use a SQL connection registry.
    pub fn with_connections(mut self, connections: Connections) -> Self {
        self.connections = Arc::new(connections);
        self
    }

    /// The API definition.
    pub fn api(&self) -> &ApiDefinition {
        &self.api
    }

    /// The pipeline library.
    pub fn pipelines(&self) -> &EpDefinition {
        &self.pipelines
    }

    /// The expression evaluator.
    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    /// The SQL connection registry.
    pub fn connections(&self) -> &Connections {
        &self.connections
    }

    /// Select the candidate point serving `request`.
    ///
    /// Candidates are tried in declared order; the first whose selector is
    /// truthy wins.
    pub fn find_endpoint(&self, request: &Request) -> Result<&ApiPoint> {
        let method = self.api.route_request(request.path(), request.method())?;
        let scope = Scope::request(request);
        for point in method.points() {
            let selected = match &point.selector {
                Selector::Literal(selected) => *selected,
                Selector::Expression(expression) => self
                    .inputs
                    .expand_str(expression, scope)?
                    .is_some_and(|v| is_truthy(&v)),
            };
            trace!(pipeline_id = %point.pipeline_id, selected, "endpoint candidate");
            if selected {
                return Ok(point);
            }
        }
        Err(Exception::not_found(format!(
            "no endpoint selected for {} {}",
            request.method(),
            request.path()
        )))
    }

    /// Run the pipeline selected for `request` and return the response.
    ///
    /// Marks the request as an event source when the selected endpoint is
    /// one; the transport adapter re-invokes this method for every cycle.
    pub async fn do_request(&self, request: &mut Request) -> Result<Response> {
        let outcome = self.serve(request).await;
        if let Err(exception) = &outcome {
            log_exception(exception);
        }
        outcome
    }

    async fn serve(&self, request: &mut Request) -> Result<Response> {
        let point = self.find_endpoint(request)?;
        request.set_event_source(point.event_source);
        let request: &Request = request;

        let span = crate::pipeline_span!(point.pipeline_id, request.method(), request.path());
        let pipeline = self.pipelines.get_pipeline(&point.pipeline_id)?;
        let response = self
            .run_steps(&pipeline.steps, request)
            .instrument(span)
            .await?;
        info!(
            pipeline_id = %point.pipeline_id,
            status = response.status_code(),
            redirect = response.redirection().is_some(),
            "request completed"
        );
        Ok(response)
    }

    async fn run_steps(&self, steps: &[Step], request: &Request) -> Result<Response> {
        let mut response = Response::new();

        for (index, step) in steps.iter().enumerate() {
            if step.disabled {
                debug!(step = index, command = %step.kind, "step disabled");
                continue;
            }
            if let Some(condition) = &step.condition {
                let active = crate::conditions::evaluate(
                    condition,
                    &self.inputs,
                    Scope::new(request, &response),
                )?;
                if !active {
                    if let Some(stop) = condition.else_break() {
                        debug!(step = index, status = stop.status_code, "condition failed, breaking");
                        response.set_status_code(stop.status_code);
                        response.set(".", json!({"errors": [{"message": stop.message}]}));
                        break;
                    }
                    debug!(step = index, command = %step.kind, "step inactive");
                    continue;
                }
            }

            debug!(step = index, command = %step.kind, "step active");
            self.run_step(step, request, &mut response).await?;

            if response.redirection().is_some() {
                debug!(step = index, "redirect, stopping pipeline");
                break;
            }
            if step.condition.as_ref().is_some_and(|c| c.stops_after()) {
                debug!(step = index, "break after step");
                break;
            }
        }

        self.finalize_redirect(request, &mut response)?;
        Ok(response)
    }

    async fn run_step(&self, step: &Step, request: &Request, response: &mut Response) -> Result<()> {
        let result = {
            let scope = Scope::new(request, response);
            let args = self.inputs.expand_args(&step.args, scope)?;
            trace!(command = %step.kind, %args, "expanded arguments");
            let config = CommandConfig {
                connections: &self.connections,
                inputs: &self.inputs,
                scope,
            };
            let command = self.commands.get(&step.kind, config)?;
            command.run(args).await?
        };
        trace!(command = %step.kind, ?result, "command returned");
        self.apply(step, result, request, response)
    }

    fn apply(
        &self,
        step: &Step,
        result: CommandReturn,
        request: &Request,
        response: &mut Response,
    ) -> Result<()> {
        let CommandReturn {
            data,
            cookies,
            redirect,
            headers,
            server_sent_events,
        } = result;

        if let (Some(path), Some(data)) = (&step.graft, data) {
            response.set(path, data);
        }
        if let Some(events) = server_sent_events {
            response.add_server_sent_events(events);
        }
        if let Some(headers) = headers {
            response.add_headers(headers);
        }
        if let Some(cookies) = cookies {
            response.add_cookies(cookies);
        }
        if let Some(template) = &step.cookies {
            let expanded = self.inputs.expand_args(template, Scope::new(request, response))?;
            response.add_cookies(parse_cookies(expanded)?);
        }
        if let Some(uri) = redirect {
            response.redirect(uri);
        }
        Ok(())
    }

    fn finalize_redirect(&self, request: &Request, response: &mut Response) -> Result<()> {
        let Some(uri) = response.redirection().cloned() else {
            return Ok(());
        };
        let scope = Scope::new(request, response);
        let url = match self.inputs.expand_str(&uri.url, scope)? {
            Some(value) => to_text(&value),
            None => uri.url.clone(),
        };
        let query_parameters = match self
            .inputs
            .expand(&Value::Object(uri.query_parameters.clone()), scope)?
        {
            Some(Value::Object(expanded)) => expanded,
            _ => uri.query_parameters,
        };
        response.redirect(Uri {
            url,
            query_parameters,
        });
        Ok(())
    }
}

fn parse_cookies(value: Value) -> Result<Vec<Cookie>> {
    let value = match value {
        Value::Null => return Ok(Vec::new()),
        single @ Value::Object(_) => Value::Array(vec![single]),
        other => other,
    };
    serde_json::from_value(value)
        .map_err(|e| Exception::ep_definition("invalid step cookies").wrap(e))
}

/// Log an exception with its private details: 4xx at `warn`, 5xx at `error`.
pub fn log_exception(exception: &Exception) {
    let details = exception.details().join("; ");
    if exception.kind().is_system() {
        error!(
            id = %exception.id(),
            code = exception.code(),
            status = exception.http_status(),
            %details,
            "request failed"
        );
    } else {
        warn!(
            id = %exception.id(),
            code = exception.code(),
            status = exception.http_status(),
            %details,
            "request rejected"
        );
    }
}
