//! HTTP API for learning progress
//!
//! JSON in, JSON out. `{learner}` is an opaque id taken from the path; no
//! authentication happens here.
//!
//! ## Catalog
//! - `GET /health` - health and database counters
//! - `GET /topics` - list topics
//! - `PUT /topics/{topic}` - create or replace a topic
//!
//! ## Ledger
//! - `POST /learners/{learner}/assessments` - record an assessment
//! - `POST /learners/{learner}/progress` - manual progress update
//! - `GET /learners/{learner}/topics/{topic}/mastery` - topic detail
//! - `GET /learners/{learner}/heatmap?subject=` - skill heatmap
//! - `GET /learners/{learner}/recommendations?limit=` - ranked recommendations
//!
//! ## Activity
//! - `GET /learners/{learner}/streak`
//! - `GET /learners/{learner}/analytics?days=`
//! - `POST|GET /learners/{learner}/sessions?days=&skip=&limit=`
//! - `POST|GET /learners/{learner}/goals?active_only=` (active only unless `active_only=false`)
//!
//! Path ids are percent-decoded, so `/topics/calc%201` names topic `calc 1`.
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X PUT http://localhost:8095/topics/fractions \
//!      -d '{"title":"Fractions","subject":"math"}'
//!
//! curl -X POST http://localhost:8095/learners/ada/assessments \
//!      -d '{"topic_id":"fractions","assessment_type":"quiz","is_correct":true}'
//!
//! curl http://localhost:8095/learners/ada/heatmap
//! ```

use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::db::{LearnerContext, ProgressDb};
use crate::error::ProgressError;
use crate::services::{
    bad_request, error_response, from_create_result, from_result, method_not_allowed, not_found, ok, HandlerResult,
    ProgressService, SessionPage,
};
use crate::services::progress_service::DEFAULT_SESSION_PAGE_SIZE;
use crate::views::{AssessmentInput, GoalInput, ProgressUpdateInput, StudySessionInput, TopicInput};

#[derive(Debug, Default, Deserialize)]
struct HeatmapQuery {
    subject: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct DaysQuery {
    days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionQuery {
    days: Option<u32>,
    skip: Option<usize>,
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct GoalQuery {
    active_only: Option<bool>,
}

fn parse_query<T: DeserializeOwned + Default>(query: Option<&str>) -> Result<T, ProgressError> {
    match query {
        None | Some("") => Ok(T::default()),
        Some(q) => serde_urlencoded::from_str(q)
            .map_err(|e| ProgressError::invalid(format!("Invalid query string: {}", e))),
    }
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ProgressError> {
    Ok(serde_json::from_slice(body)?)
}

fn decode_segment(raw: &str) -> Result<Cow<'_, str>, ProgressError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| ProgressError::invalid(format!("Path segment '{}' is not valid UTF-8", raw)))
}

/// Learner-scoped routes
#[derive(Debug, Clone, PartialEq, Eq)]
enum LearnerRoute<'a> {
    Assessments,
    Progress,
    TopicMastery(Cow<'a, str>),
    Heatmap,
    Recommendations,
    Streak,
    Analytics,
    Sessions,
    Goals,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Route<'a> {
    Health,
    Topics,
    Topic(Cow<'a, str>),
    Learner(Cow<'a, str>, LearnerRoute<'a>),
}

/// Match a path to a route. Id segments come back percent-decoded.
fn route(path: &str) -> Result<Option<Route<'_>>, ProgressError> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    let route = match segments.as_slice() {
        ["health"] => Route::Health,
        ["topics"] => Route::Topics,
        ["topics", topic] if !topic.is_empty() => Route::Topic(decode_segment(*topic)?),
        ["learners", learner, rest @ ..] if !learner.is_empty() => {
            let sub = match rest {
                ["assessments"] => LearnerRoute::Assessments,
                ["progress"] => LearnerRoute::Progress,
                ["topics", topic, "mastery"] if !topic.is_empty() => {
                    LearnerRoute::TopicMastery(decode_segment(*topic)?)
                }
                ["heatmap"] => LearnerRoute::Heatmap,
                ["recommendations"] => LearnerRoute::Recommendations,
                ["streak"] => LearnerRoute::Streak,
                ["analytics"] => LearnerRoute::Analytics,
                ["sessions"] => LearnerRoute::Sessions,
                ["goals"] => LearnerRoute::Goals,
                _ => return Ok(None),
            };
            Route::Learner(decode_segment(*learner)?, sub)
        }
        _ => return Ok(None),
    };

    Ok(Some(route))
}

/// HTTP server state
pub struct HttpServer {
    progress: Arc<ProgressService>,
    db: Arc<ProgressDb>,
    bind_addr: SocketAddr,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(progress: Arc<ProgressService>, db: Arc<ProgressDb>, bind_addr: SocketAddr) -> Self {
        Self {
            progress,
            db,
            bind_addr,
        }
    }

    /// Run the HTTP server
    pub async fn run(self: Arc<Self>) -> Result<(), ProgressError> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        info!(addr = %self.bind_addr, "HTTP server listening");

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { server.handle_request(req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    warn!(addr = %remote_addr, error = %err, "Connection error");
                }
            });
        }
    }

    /// Read the body, then route
    async fn handle_request(&self, req: Request<Incoming>) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(str::to_string);

        debug!(method = %method, path = %path, "Incoming request");

        let body = match req.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(error = %e, "Failed to read request body");
                return Ok(bad_request(&format!("Failed to read body: {}", e)));
            }
        };

        Ok(self.respond(&method, &path, query.as_deref(), body))
    }

    /// Route a fully read request
    fn respond(&self, method: &Method, path: &str, query: Option<&str>, body: Bytes) -> Response<Full<Bytes>> {
        let route = match route(path) {
            Ok(Some(route)) => route,
            Ok(None) => return not_found("Not Found"),
            Err(e) => return error_response(e),
        };

        match self.dispatch(method, route, query, body) {
            Ok(response) => response,
            Err(e) => {
                if matches!(e, ProgressError::NotFound(_) | ProgressError::InvalidInput(_) | ProgressError::Json(_)) {
                    debug!(error = %e, "Request rejected");
                } else {
                    error!(error = %e, "Request error");
                }
                error_response(e)
            }
        }
    }

    fn dispatch(&self, method: &Method, route: Route<'_>, query: Option<&str>, body: Bytes) -> HandlerResult {
        match (method, route) {
            (&Method::GET, Route::Health) => self.handle_health(),

            (&Method::GET, Route::Topics) => Ok(from_result(self.progress.list_topics())),
            (&Method::PUT, Route::Topic(id)) => {
                let input: TopicInput = parse_body(&body)?;
                Ok(from_result(self.progress.upsert_topic(input.into_topic(&id))))
            }

            (method, Route::Learner(learner, sub)) => {
                let ctx = LearnerContext::parse(&learner)?;
                self.dispatch_learner(method, &ctx, sub, query, body)
            }

            _ => Ok(method_not_allowed()),
        }
    }

    fn dispatch_learner(
        &self,
        method: &Method,
        ctx: &LearnerContext,
        route: LearnerRoute<'_>,
        query: Option<&str>,
        body: Bytes,
    ) -> HandlerResult {
        let progress = &self.progress;

        let response = match (method, route) {
            (&Method::POST, LearnerRoute::Assessments) => {
                let input: AssessmentInput = parse_body(&body)?;
                from_result(progress.record_assessment(ctx, input))
            }
            (&Method::POST, LearnerRoute::Progress) => {
                let input: ProgressUpdateInput = parse_body(&body)?;
                from_result(progress.update_progress(ctx, input))
            }
            (&Method::GET, LearnerRoute::TopicMastery(topic)) => {
                from_result(progress.get_topic_mastery(ctx, &topic))
            }
            (&Method::GET, LearnerRoute::Heatmap) => {
                let q: HeatmapQuery = parse_query(query)?;
                from_result(progress.get_heatmap(ctx, q.subject.as_deref()))
            }
            (&Method::GET, LearnerRoute::Recommendations) => {
                let q: LimitQuery = parse_query(query)?;
                from_result(progress.get_recommendations(ctx, q.limit))
            }
            (&Method::GET, LearnerRoute::Streak) => from_result(progress.get_streak(ctx)),
            (&Method::GET, LearnerRoute::Analytics) => {
                let q: DaysQuery = parse_query(query)?;
                from_result(progress.get_analytics(ctx, q.days))
            }
            (&Method::POST, LearnerRoute::Sessions) => {
                let input: StudySessionInput = parse_body(&body)?;
                from_create_result(progress.record_study_session(ctx, input))
            }
            (&Method::GET, LearnerRoute::Sessions) => {
                let q: SessionQuery = parse_query(query)?;
                let page = SessionPage {
                    days: q.days,
                    skip: q.skip.unwrap_or(0),
                    limit: q.limit.unwrap_or(DEFAULT_SESSION_PAGE_SIZE),
                };
                from_result(progress.list_study_sessions(ctx, page))
            }
            (&Method::POST, LearnerRoute::Goals) => {
                let input: GoalInput = parse_body(&body)?;
                from_create_result(progress.create_goal(ctx, input))
            }
            (&Method::GET, LearnerRoute::Goals) => {
                let q: GoalQuery = parse_query(query)?;
                from_result(progress.list_goals(ctx, q.active_only.unwrap_or(true)))
            }
            _ => method_not_allowed(),
        };

        Ok(response)
    }

    /// Health check endpoint
    fn handle_health(&self) -> HandlerResult {
        let stats = self.db.stats()?;
        Ok(ok(&serde_json::json!({
            "status": "ok",
            "topics": stats.topic_count,
            "progress_records": stats.progress_record_count,
            "assessments": stats.assessment_count,
            "sessions": stats.session_count,
        })))
    }
}
