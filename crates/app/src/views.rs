use std::error::Error;
use std::future::Future;
use std::io;
use std::sync::Arc;

use quiz_core::model::QuizId;
use services::session::{Notice, SessionCommand};
use services::{
    IntegrityMonitor, QuizApi, QuizSession, ResultsService, Route, SessionController,
    SessionEvent, SessionOutcome, SessionStore, SessionView, VisibilityEvent,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::input::{self, ExamInput};
use crate::render;

type ViewResult = Result<Next, Box<dyn Error>>;

/// Where to go after a view returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Next {
    Go(Route),
    Quit,
}

/// Lines typed on stdin, read by one background task for the whole process.
struct Terminal {
    lines: mpsc::UnboundedReceiver<String>,
}

impl Terminal {
    fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self { lines: rx }
    }

    async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Next line on a menu screen; `None` when stdin closes or Ctrl-C is pressed.
    async fn next_menu_line(&mut self) -> Option<String> {
        line_or_interrupt(&mut self.lines, tokio::signal::ctrl_c()).await
    }
}

async fn line_or_interrupt<F>(
    lines: &mut mpsc::UnboundedReceiver<String>,
    interrupt: F,
) -> Option<String>
where
    F: Future<Output = io::Result<()>>,
{
    tokio::select! {
        line = lines.recv() => line,
        signal = interrupt => match signal {
            Ok(()) => {
                tracing::info!("interrupted at menu");
                None
            }
            Err(error) => {
                tracing::warn!(%error, "ctrl-c handler unavailable");
                lines.recv().await
            }
        },
    }
}

/// Terminal host: landing, exam and results views navigated by route.
pub struct Shell {
    config: Config,
    store: SessionStore,
    api: Arc<dyn QuizApi>,
    results: ResultsService,
    quiz_id: QuizId,
    terminal: Terminal,
}

impl Shell {
    pub fn new(
        config: Config,
        store: SessionStore,
        api: Arc<dyn QuizApi>,
        quiz_id: QuizId,
    ) -> Self {
        Self {
            config,
            results: ResultsService::new(store.clone()),
            store,
            api,
            quiz_id,
            terminal: Terminal::spawn(),
        }
    }

    pub async fn run(&mut self, mut route: Route) -> Result<(), Box<dyn Error>> {
        loop {
            tracing::info!(%route, "navigating");
            let next = match route {
                Route::Landing => self.landing().await?,
                Route::Exam { quiz_id } => {
                    if let Some(id) = quiz_id {
                        self.quiz_id = id;
                    }
                    self.exam().await?
                }
                Route::Results => self.results().await?,
            };
            match next {
                Next::Go(target) => route = target,
                Next::Quit => return Ok(()),
            }
        }
    }

    async fn landing(&mut self) -> ViewResult {
        let policy = self.config.policy();
        print!(
            "{}",
            render::landing(
                self.quiz_id,
                policy.attempt_duration.num_seconds(),
                policy.violation_limit
            )
        );

        while let Some(line) = self.terminal.next_menu_line().await {
            let line = line.trim();
            match line {
                "start" => return Ok(Next::Go(Route::exam(self.quiz_id))),
                "quit" | "q" => return Ok(Next::Quit),
                path if path.starts_with('/') => return Ok(Next::Go(Route::parse(path))),
                "" => {}
                other => println!("unknown command: {other}"),
            }
        }
        Ok(Next::Quit)
    }

    async fn exam(&mut self) -> ViewResult {
        let controller = SessionController::new(self.quiz_id, self.config.policy());
        let session = QuizSession::new(controller, self.store.clone(), Arc::clone(&self.api));

        let (commands_tx, commands_rx) = mpsc::channel(16);
        let (visibility, visibility_rx) = mpsc::unbounded_channel();
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let monitor = IntegrityMonitor::new(visibility_rx);
        let mut task = tokio::spawn(session.run(commands_rx, monitor, events_tx));

        // Dropping the sender closes the view; the runner keeps persisted state.
        let mut commands = Some(commands_tx);
        let mut view: Option<SessionView> = None;
        let mut confirming_exit = false;
        let mut unload_prompted = false;
        println!("{}", render::exam_help());

        loop {
            tokio::select! {
                outcome = &mut task => {
                    return Ok(match outcome? {
                        SessionOutcome::Results(_) => Next::Go(Route::Results),
                        SessionOutcome::Abandoned => Next::Go(Route::Landing),
                        SessionOutcome::Closed => {
                            println!("Progress saved. Run again to resume before the time runs out.");
                            Next::Quit
                        }
                    });
                }
                Some(event) = events.recv() => show_event(event, &mut view),
                line = self.terminal.next_line(), if commands.is_some() => {
                    let Some(line) = line else {
                        commands = None;
                        continue;
                    };

                    if confirming_exit {
                        confirming_exit = false;
                        if input::is_confirmation(&line) {
                            send(commands.as_ref(), SessionCommand::Exit).await;
                        } else {
                            println!("Exit cancelled.");
                        }
                        continue;
                    }

                    match input::parse_exam_line(&line, view.as_ref()) {
                        ExamInput::Command(command) => send(commands.as_ref(), command).await,
                        ExamInput::Hide => {
                            let _ = visibility.send(VisibilityEvent::Hidden);
                        }
                        ExamInput::Show => {
                            let _ = visibility.send(VisibilityEvent::Visible);
                        }
                        ExamInput::RequestExit => {
                            confirming_exit = true;
                            println!("Exit the quiz? Your answers will be erased. (y/N)");
                        }
                        ExamInput::Help => println!("{}", render::exam_help()),
                        ExamInput::Ignored => {}
                        ExamInput::Invalid(message) => println!("{message}"),
                    }
                }
                _ = tokio::signal::ctrl_c(), if commands.is_some() => {
                    if unload_prompted {
                        commands = None;
                    } else {
                        unload_prompted = true;
                        let _ = visibility.send(VisibilityEvent::BeforeUnload);
                        println!("Press Ctrl-C again to close. Your progress is kept.");
                    }
                }
            }
        }
    }

    async fn results(&mut self) -> ViewResult {
        let Some(report) = self.results.load().await else {
            println!("No results to show.");
            return Ok(Next::Go(Route::Landing));
        };
        print!("{}", render::report(&report));

        while let Some(line) = self.terminal.next_menu_line().await {
            match line.trim() {
                "retake" | "r" => return Ok(Next::Go(self.results.retake(self.quiz_id).await)),
                "home" | "h" => return Ok(Next::Go(self.results.go_home(self.quiz_id).await)),
                "quit" | "q" => return Ok(Next::Quit),
                "" => {}
                other => println!("unknown command: {other}"),
            }
        }
        Ok(Next::Quit)
    }
}

async fn send(commands: Option<&mpsc::Sender<SessionCommand>>, command: SessionCommand) {
    let Some(commands) = commands else {
        return;
    };
    if commands.send(command).await.is_err() {
        tracing::debug!(?command, "session already finished");
    }
}

fn show_event(event: SessionEvent, view: &mut Option<SessionView>) {
    match event {
        SessionEvent::Updated(next) => {
            print!("{}", render::session(&next));
            *view = Some(next);
        }
        SessionEvent::Remaining(secs) => {
            if let Some(view) = view.as_mut() {
                view.remaining_secs = secs;
            }
            if let Some(line) = render::clock_reminder(secs) {
                println!("{line}");
            }
        }
        SessionEvent::Notice(Notice::UnloadPrompt) => println!("? {}", Notice::UnloadPrompt),
        SessionEvent::Notice(notice) => println!("! {notice}"),
        SessionEvent::Rejected(message) => println!("! {message}"),
    }
}
