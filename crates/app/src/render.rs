use std::fmt::Write as _;

use quiz_core::model::{QuizId, ScoreReport};
use services::SessionView;
use services::session::{SessionState, format_clock};

pub fn landing(quiz_id: QuizId, attempt_secs: i64, violation_limit: u32) -> String {
    let minutes = attempt_secs / 60;
    let mut out = String::new();
    let _ = writeln!(out, "== Quiz {quiz_id} ==");
    let _ = writeln!(
        out,
        "You have {minutes} minute(s). The clock keeps running if you close the program."
    );
    let _ = writeln!(
        out,
        "Leaving the quiz {violation_limit} time(s) submits it automatically."
    );
    let _ = writeln!(out, "Type `start` to begin or `quit` to leave.");
    out
}

pub fn exam_help() -> &'static str {
    "Commands: n (next), p (previous), j <N> (jump), a <K> (answer option K), \
     s (submit, last question), x (exit), hide/show (leave/return), ? (help)"
}

/// Full screen for the current question.
pub fn session(view: &SessionView) -> String {
    let mut out = String::new();
    match view.state {
        SessionState::Idle => {
            let message = view.error.as_deref().unwrap_or("Not started");
            let _ = writeln!(out, "{message}. Type `retry` to try again.");
            return out;
        }
        SessionState::Loading => {
            let _ = writeln!(out, "Loading questions...");
            return out;
        }
        SessionState::Submitting(_) => {
            let _ = writeln!(out, "Submitting...");
            return out;
        }
        SessionState::Terminated(_) => return out,
        SessionState::InProgress => {}
    }

    let _ = writeln!(
        out,
        "[{}] Question {}/{}   {}",
        format_clock(view.remaining_secs),
        view.index + 1,
        view.total,
        pills(view)
    );
    if view.violations > 0 {
        let _ = writeln!(
            out,
            "Violations: {}/{}",
            view.violations, view.violation_limit
        );
    }
    if let Some(error) = &view.error {
        let _ = writeln!(out, "! {error}");
    }

    match &view.question {
        Some(question) => {
            let _ = writeln!(out, "{}", question.text());
            for (position, option) in question.options().iter().enumerate() {
                let marker = if view.selected == Some(option.id()) {
                    "*"
                } else {
                    " "
                };
                let _ = writeln!(out, " {marker} {}. {}", position + 1, option.text());
            }
        }
        None => {
            let _ = writeln!(out, "This quiz has no questions.");
        }
    }

    if view.can_submit() {
        let _ = writeln!(
            out,
            "Last question: `s` submits ({}/{} answered, {} open).",
            view.progress.answered,
            view.progress.total,
            view.progress.remaining
        );
    }
    out
}

/// One cell per question: `#` answered, `.` open, brackets around the current one.
fn pills(view: &SessionView) -> String {
    view.answered
        .iter()
        .enumerate()
        .map(|(index, answered)| {
            let mark = if *answered { '#' } else { '.' };
            if index == view.index {
                format!("[{mark}]")
            } else {
                mark.to_string()
            }
        })
        .collect()
}

/// Countdown line printed at the minute marks and through the last ten seconds.
pub fn clock_reminder(remaining_secs: u64) -> Option<String> {
    let due = remaining_secs > 0 && (remaining_secs % 60 == 0 || remaining_secs <= 10);
    due.then(|| format!("[{} left]", format_clock(remaining_secs)))
}

pub fn report(report: &ScoreReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== Results ==");
    let _ = writeln!(out, "Score: {:.1}%", report.score_percent);
    let _ = writeln!(
        out,
        "Correct: {}  Wrong: {}  Unanswered: {}  Total: {}",
        report.correct_count,
        report.wrong_count,
        report.unanswered_count(),
        report.total_questions
    );
    for result in &report.results {
        let verdict = if result.is_correct { "ok " } else { "ERR" };
        let _ = write!(out, "{verdict} {}", result.question_text);
        if !result.is_correct && !result.correct_answer_text.is_empty() {
            let _ = write!(out, " (answer: {})", result.correct_answer_text);
        }
        out.push('\n');
    }
    let _ = writeln!(out, "Type `retake` or `home`.");
    out
}

#[cfg(test)]
mod tests {
    use quiz_core::model::{OptionId, Question, QuestionId, QuestionResult, QuizOption};
    use services::session::NavigatorProgress;

    use super::*;

    fn view() -> SessionView {
        let question = Question::new(
            QuestionId::new(2),
            "Pick one",
            vec![
                QuizOption::new(OptionId::new(20), "alpha"),
                QuizOption::new(OptionId::new(21), "beta"),
            ],
        )
        .unwrap();
        SessionView {
            quiz_id: QuizId::new(1),
            state: SessionState::InProgress,
            index: 1,
            total: 2,
            question: Some(question),
            selected: Some(OptionId::new(21)),
            answered: vec![false, true],
            progress: NavigatorProgress {
                total: 2,
                answered: 1,
                remaining: 1,
            },
            remaining_secs: 125,
            violations: 1,
            violation_limit: 2,
            error: None,
            is_last: true,
        }
    }

    #[test]
    fn session_screen_shows_clock_pills_and_selection() {
        let screen = session(&view());
        assert!(screen.contains("[02:05] Question 2/2   .[#]"));
        assert!(screen.contains("Violations: 1/2"));
        assert!(screen.contains(" * 2. beta"));
        assert!(screen.contains("   1. alpha"));
        assert!(screen.contains("`s` submits (1/2 answered, 1 open)"));
    }

    #[test]
    fn idle_screen_shows_load_error() {
        let mut idle = view();
        idle.state = SessionState::Idle;
        idle.error = Some("Could not load questions".into());
        assert_eq!(
            session(&idle),
            "Could not load questions. Type `retry` to try again.\n"
        );
    }

    #[test]
    fn clock_reminders_at_minutes_and_final_seconds() {
        assert_eq!(clock_reminder(120).as_deref(), Some("[02:00 left]"));
        assert_eq!(clock_reminder(9).as_deref(), Some("[00:09 left]"));
        assert_eq!(clock_reminder(61), None);
        assert_eq!(clock_reminder(0), None);
    }

    #[test]
    fn report_lists_wrong_answers_with_solution() {
        let report = report(&ScoreReport {
            total_questions: 3,
            correct_count: 1,
            wrong_count: 1,
            score_percent: 33.333,
            results: vec![
                QuestionResult {
                    question_id: QuestionId::new(1),
                    question_text: "One".into(),
                    is_correct: true,
                    correct_answer_text: String::new(),
                },
                QuestionResult {
                    question_id: QuestionId::new(2),
                    question_text: "Two".into(),
                    is_correct: false,
                    correct_answer_text: "beta".into(),
                },
            ],
        });
        assert!(report.contains("Score: 33.3%"));
        assert!(report.contains("Unanswered: 1"));
        assert!(report.contains("ok  One\n"));
        assert!(report.contains("ERR Two (answer: beta)\n"));
    }
}
