use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};

use crate::api::Backend;
use crate::state::{Delta, ProviderCommand};

/// Runs backend calls off the UI thread. Exits once the command sender is dropped.
pub fn spawn_provider(
    backend: Box<dyn Backend>,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        info!("provider started");
        while let Ok(cmd) = cmd_rx.recv() {
            let delta = handle(backend.as_ref(), cmd, &tx);
            if tx.send(delta).is_err() {
                break;
            }
        }
        info!("provider stopped");
    })
}

fn handle(backend: &dyn Backend, cmd: ProviderCommand, tx: &Sender<Delta>) -> Delta {
    match cmd {
        ProviderCommand::Register(req) => {
            debug!("register {}", req.email);
            Delta::Registered(backend.register(&req))
        }
        ProviderCommand::Login(req) => {
            debug!("login {}", req.email);
            Delta::LoggedIn(backend.login(&req))
        }
        ProviderCommand::FetchFixtures {
            gameweek,
            generation,
        } => Delta::Fixtures {
            generation,
            result: backend.fetch_fixtures(gameweek),
        },
        ProviderCommand::FetchUserData { token, generation } => Delta::UserData {
            generation,
            result: backend.user_data(&token),
        },
        ProviderCommand::SavePredictions {
            token,
            date,
            gameweek,
            late,
            request,
        } => {
            let result = backend.save_predictions(&token, &request);
            match &result {
                Ok(_) => {
                    let _ = tx.send(Delta::Log(format!(
                        "[INFO] Saved {} predictions for {date}",
                        request.predictions.len()
                    )));
                }
                Err(err) => warn!("save predictions for {date}: {err}"),
            }
            Delta::PredictionsSaved {
                date,
                gameweek,
                late,
                joker_fixture_id: request.joker_fixture_id,
                result,
            }
        }
        ProviderCommand::SaveProphecies { token, prophecies } => {
            let result = backend.save_prophecies(&token, &prophecies);
            Delta::PropheciesSaved { prophecies, result }
        }
        ProviderCommand::ScoreGameweek { token } => {
            Delta::GameweekScored(backend.score_gameweek(&token))
        }
        ProviderCommand::FetchLeaderboard { generation } => Delta::Leaderboard {
            generation,
            result: backend.fetch_leaderboard(),
        },
    }
}
