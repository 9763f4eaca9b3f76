use services::session::SessionCommand;
use services::SessionView;

/// A line typed during the exam, interpreted against the current view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamInput {
    Command(SessionCommand),
    /// Simulated focus loss and return.
    Hide,
    Show,
    /// Exit was requested; it needs confirmation before `SessionCommand::Exit`.
    RequestExit,
    Help,
    Ignored,
    Invalid(String),
}

pub fn parse_exam_line(line: &str, view: Option<&SessionView>) -> ExamInput {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return ExamInput::Ignored;
    };
    let arg = words.next();

    match head.to_ascii_lowercase().as_str() {
        "n" | "next" => ExamInput::Command(SessionCommand::Next),
        "p" | "prev" => ExamInput::Command(SessionCommand::Prev),
        "retry" => ExamInput::Command(SessionCommand::Start),
        "j" | "jump" => match parse_position(arg) {
            Some(position) => ExamInput::Command(SessionCommand::JumpTo(position)),
            None => ExamInput::Invalid("usage: j <question number>".into()),
        },
        "a" | "answer" => answer(arg, view),
        "s" | "submit" => match view {
            Some(view) if view.can_submit() => ExamInput::Command(SessionCommand::Submit),
            Some(view) if view.total == 0 => {
                ExamInput::Invalid("There are no questions to submit.".into())
            }
            _ => ExamInput::Invalid("Submit is available on the last question.".into()),
        },
        "x" | "exit" => ExamInput::RequestExit,
        "hide" => ExamInput::Hide,
        "show" => ExamInput::Show,
        "?" | "help" => ExamInput::Help,
        other => ExamInput::Invalid(format!("unknown command: {other}")),
    }
}

/// Accepts a yes for the exit confirmation.
pub fn is_confirmation(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// 1-based number typed by the user to 0-based position.
fn parse_position(arg: Option<&str>) -> Option<usize> {
    arg?.parse::<usize>().ok()?.checked_sub(1)
}

fn answer(arg: Option<&str>, view: Option<&SessionView>) -> ExamInput {
    let Some(question) = view.and_then(|view| view.question.as_ref()) else {
        return ExamInput::Invalid("No question to answer.".into());
    };
    let option = parse_position(arg).and_then(|position| question.options().get(position));
    match option {
        Some(option) => ExamInput::Command(SessionCommand::Select {
            question_id: question.id(),
            option_id: option.id(),
        }),
        None => ExamInput::Invalid(format!(
            "choose an option between 1 and {}",
            question.options().len()
        )),
    }
}
