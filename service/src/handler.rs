//! `clima.v1.TweetService` implementation

use crate::journal::TweetJournal;
use clima_core::proto::TweetService;
use clima_core::{Rejection, TweetRequest, TweetResponse};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{info, warn};

/// Validates and logs relayed tweets
///
/// Cheap to clone; all clones share one journal.
#[derive(Clone)]
pub struct TweetHandler {
    journal: Arc<TweetJournal>,
}

impl TweetHandler {
    /// Create a handler recording into `journal`
    pub fn new(journal: Arc<TweetJournal>) -> Self {
        Self { journal }
    }

    /// Journal shared with every clone of this handler
    pub fn journal(&self) -> Arc<TweetJournal> {
        Arc::clone(&self.journal)
    }

    /// Validate and record one tweet
    ///
    /// Synchronous: nothing in here awaits.
    pub fn process(&self, tweet: &TweetRequest) -> Result<TweetResponse, Rejection> {
        if let Some(rejection) = Rejection::check(tweet) {
            self.journal.record_rejected();
            warn!(
                missing = ?rejection.missing_fields,
                "Incomplete tweet rejected"
            );
            return Err(rejection);
        }

        let sequence =
            self.journal
                .record_accepted(&tweet.country, &tweet.weather, &tweet.description);

        info!(
            sequence,
            country = %tweet.country,
            weather = %tweet.weather,
            description = %tweet.description,
            "Tweet received"
        );

        Ok(TweetResponse {
            status: format!(
                "Tweet from {} received and processed correctly",
                tweet.country
            ),
        })
    }
}

#[tonic::async_trait]
impl TweetService for TweetHandler {
    async fn send_tweet(
        &self,
        request: Request<TweetRequest>,
    ) -> Result<Response<TweetResponse>, Status> {
        let tweet = request.into_inner();
        self.process(&tweet)
            .map(Response::new)
            .map_err(Status::from)
    }
}
