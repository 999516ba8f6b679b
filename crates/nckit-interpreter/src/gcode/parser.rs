//! Line parser
//!
//! Turns the tokens of one line into structured commands. The parser is a
//! pure function of the line text and the modal context; it never fails a
//! whole line. Malformed words are reported as diagnostics and skipped.

use nckit_core::{
    Axis, CoolantState, DistanceMode, MotionKind, ParseError, Plane, SpindleState, Units,
    WorkOffset,
};

use super::command::{AuxiliaryAction, AxisWords, CenterOffsets, Command, CommandKind};
use super::state::ModalContext;
use super::tokenizer::{Token, Tokenizer};
use crate::diagnostics::Diagnostic;

/// Result of parsing one line
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedLine {
    /// 0-based source line index
    pub line: usize,
    /// `N` number, if the line carried one
    pub block_number: Option<u32>,
    /// Commands in execution order
    pub commands: Vec<Command>,
    /// Problems found on the line
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedLine {
    /// Whether the line produced any motion command
    pub fn has_motion(&self) -> bool {
        self.commands.iter().any(Command::is_motion)
    }
}

/// Stateless line parser
pub struct LineParser;

impl LineParser {
    /// Parse one line under the given modal context
    pub fn parse_line(line: usize, text: &str, context: &ModalContext) -> ParsedLine {
        let mut builder = LineBuilder::new(line, *context);
        for token in Tokenizer::new(text) {
            builder.push(token);
        }
        builder.finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GroupKind {
    Motion(MotionKind),
    AxisOffset,
}

/// Words collected for one motion code (or G92) on a line
#[derive(Debug)]
struct WordGroup {
    kind: GroupKind,
    implicit: bool,
    axes: AxisWords,
    center: CenterOffsets,
    radius: Option<f64>,
}

impl WordGroup {
    fn new(kind: GroupKind, implicit: bool) -> Self {
        Self {
            kind,
            implicit,
            axes: AxisWords::new(),
            center: CenterOffsets::default(),
            radius: None,
        }
    }

    fn has_words(&self) -> bool {
        !self.axes.is_empty() || !self.center.is_empty() || self.radius.is_some()
    }

    fn accepts_arc_words(&self) -> bool {
        matches!(self.kind, GroupKind::Motion(kind) if kind.is_arc())
    }
}

/// A modal code seen on the line, with its text for conflict messages
type Modal<T> = Option<(T, String)>;

struct LineBuilder {
    line: usize,
    context: ModalContext,
    block_number: Option<u32>,
    comment: Option<String>,
    no_op: bool,
    feed_rate: Option<f64>,
    spindle_speed: Option<f64>,
    tool: Option<u32>,
    machine_actions: Vec<AuxiliaryAction>,
    dwell: bool,
    dwell_seconds: Option<f64>,
    plane: Modal<Plane>,
    units: Modal<Units>,
    distance_mode: Modal<DistanceMode>,
    work_offset: Modal<WorkOffset>,
    clear_axis_offset: bool,
    groups: Vec<WordGroup>,
    program_flow: Vec<AuxiliaryAction>,
    diagnostics: Vec<Diagnostic>,
}

impl LineBuilder {
    fn new(line: usize, context: ModalContext) -> Self {
        Self {
            line,
            context,
            block_number: None,
            comment: None,
            no_op: false,
            feed_rate: None,
            spindle_speed: None,
            tool: None,
            machine_actions: Vec::new(),
            dwell: false,
            dwell_seconds: None,
            plane: None,
            units: None,
            distance_mode: None,
            work_offset: None,
            clear_axis_offset: false,
            groups: Vec::new(),
            program_flow: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn push(&mut self, token: Token) {
        let result = match token {
            Token::Word {
                letter, value, raw, ..
            } => self.word(letter, value, &raw),
            Token::BlockNumber(n) => {
                self.block_number.get_or_insert(n);
                Ok(())
            }
            Token::Comment(text) => {
                self.comment = Some(text);
                Ok(())
            }
            Token::ProgramMarker => {
                self.no_op = true;
                Ok(())
            }
            // block delete switch is off
            Token::BlockDelete => Ok(()),
            Token::Error(err) => Err(ParseError::Lex(err)),
        };

        if let Err(err) = result {
            self.diagnostics.push(Diagnostic::parse(self.line, &err));
        }
    }

    fn word(&mut self, letter: char, value: f64, raw: &str) -> Result<(), ParseError> {
        match letter {
            'G' => self.g_code(value, raw),
            'M' => self.m_code(value, raw),
            'F' => {
                if value < 0.0 {
                    return Err(invalid(letter, value, "feed rate cannot be negative"));
                }
                set_once(&mut self.feed_rate, letter, value)
            }
            'S' => {
                if value < 0.0 {
                    return Err(invalid(letter, value, "spindle speed cannot be negative"));
                }
                set_once(&mut self.spindle_speed, letter, value)
            }
            'T' => {
                if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
                    return Err(invalid(
                        letter,
                        value,
                        "tool number must be a non-negative integer",
                    ));
                }
                set_once(&mut self.tool, letter, value as u32)
            }
            'P' => {
                if value < 0.0 {
                    return Err(invalid(letter, value, "dwell time cannot be negative"));
                }
                set_once(&mut self.dwell_seconds, letter, value)
            }
            'I' | 'J' | 'K' | 'R' => self.arc_word(letter, value),
            _ => match Axis::from_letter(letter) {
                Some(axis) => self.axis_word(axis, value),
                None => Err(ParseError::UnexpectedWord {
                    letter,
                    reason: "unsupported address".to_string(),
                }),
            },
        }
    }

    fn g_code(&mut self, value: f64, raw: &str) -> Result<(), ParseError> {
        let code = format!("G{}", raw);
        if (value - 92.1).abs() < 1e-9 {
            self.clear_axis_offset = true;
            return Ok(());
        }
        if value.fract() != 0.0 || !(0.0..=999.0).contains(&value) {
            return Err(unknown('G', raw));
        }

        let number = value as u16;
        if let Some(kind) = MotionKind::from_gcode(number) {
            self.groups.push(WordGroup::new(GroupKind::Motion(kind), false));
            return Ok(());
        }
        if let Some(plane) = Plane::from_gcode(number) {
            return set_modal(&mut self.plane, plane, code, "plane");
        }
        if let Some(offset) = WorkOffset::from_gcode(number) {
            return set_modal(&mut self.work_offset, offset, code, "coordinate system");
        }
        match number {
            4 => {
                self.dwell = true;
                Ok(())
            }
            20 => set_modal(&mut self.units, Units::INCH, code, "units"),
            21 => set_modal(&mut self.units, Units::MM, code, "units"),
            90 => set_modal(
                &mut self.distance_mode,
                DistanceMode::Absolute,
                code,
                "distance",
            ),
            91 => set_modal(
                &mut self.distance_mode,
                DistanceMode::Incremental,
                code,
                "distance",
            ),
            92 => {
                self.groups.push(WordGroup::new(GroupKind::AxisOffset, false));
                Ok(())
            }
            94 => {
                self.no_op = true;
                Ok(())
            }
            _ => Err(unknown('G', raw)),
        }
    }

    fn m_code(&mut self, value: f64, raw: &str) -> Result<(), ParseError> {
        if value.fract() != 0.0 || value < 0.0 {
            return Err(unknown('M', raw));
        }
        let action = match value as u32 {
            0 => AuxiliaryAction::Pause { optional: false },
            1 => AuxiliaryAction::Pause { optional: true },
            2 | 30 => AuxiliaryAction::ProgramEnd,
            3 => AuxiliaryAction::Spindle(SpindleState::Clockwise),
            4 => AuxiliaryAction::Spindle(SpindleState::CounterClockwise),
            5 => AuxiliaryAction::Spindle(SpindleState::Off),
            6 => AuxiliaryAction::ToolChange,
            7 => AuxiliaryAction::Coolant(CoolantState::Mist),
            8 => AuxiliaryAction::Coolant(CoolantState::Flood),
            9 => AuxiliaryAction::Coolant(CoolantState::Off),
            _ => return Err(unknown('M', raw)),
        };
        match action {
            AuxiliaryAction::Pause { .. } | AuxiliaryAction::ProgramEnd => {
                self.program_flow.push(action)
            }
            _ => self.machine_actions.push(action),
        }
        Ok(())
    }

    /// Group that axis and arc words attach to, opening an implicit one
    fn current_group(&mut self) -> &mut WordGroup {
        if self.groups.is_empty() {
            self.groups.push(WordGroup::new(
                GroupKind::Motion(self.context.motion_mode),
                true,
            ));
        }
        let last = self.groups.len() - 1;
        &mut self.groups[last]
    }

    fn axis_word(&mut self, axis: Axis, value: f64) -> Result<(), ParseError> {
        let group = self.current_group();
        if group.axes.contains(axis) {
            return Err(ParseError::DuplicateWord {
                letter: axis.letter(),
            });
        }
        group.axes.set(axis, value);
        Ok(())
    }

    fn arc_word(&mut self, letter: char, value: f64) -> Result<(), ParseError> {
        let group = self.current_group();
        if !group.accepts_arc_words() {
            return Err(ParseError::UnexpectedWord {
                letter,
                reason: "arc words need G2 or G3".to_string(),
            });
        }
        let slot = match letter {
            'I' => &mut group.center.i,
            'J' => &mut group.center.j,
            'K' => &mut group.center.k,
            _ => &mut group.radius,
        };
        set_once(slot, letter, value)
    }

    fn finish(mut self) -> ParsedLine {
        let line = self.line;
        let mut commands = Vec::new();
        let mut emit = |kind: CommandKind| commands.push(Command::new(line, kind));

        if let Some(text) = self.comment.take() {
            emit(CommandKind::Comment(text));
        }
        if self.no_op {
            emit(CommandKind::NoOp);
        }
        if let Some(rate) = self.feed_rate {
            emit(CommandKind::SetFeedRate(rate));
        }
        if let Some(rpm) = self.spindle_speed {
            emit(CommandKind::Auxiliary(AuxiliaryAction::SpindleSpeed(rpm)));
        }
        if let Some(tool) = self.tool {
            emit(CommandKind::Auxiliary(AuxiliaryAction::SelectTool(tool)));
        }
        for action in self.machine_actions.drain(..) {
            emit(CommandKind::Auxiliary(action));
        }

        match (self.dwell, self.dwell_seconds) {
            (true, Some(seconds)) => {
                emit(CommandKind::Auxiliary(AuxiliaryAction::Dwell { seconds }))
            }
            (true, None) => self.diagnostics.push(Diagnostic::parse(
                line,
                &ParseError::MissingWord {
                    code: "G4".to_string(),
                    letter: 'P',
                },
            )),
            (false, Some(_)) => self.diagnostics.push(Diagnostic::parse(
                line,
                &ParseError::UnexpectedWord {
                    letter: 'P',
                    reason: "P is only used with G4".to_string(),
                },
            )),
            (false, None) => {}
        }

        if let Some((plane, _)) = self.plane {
            emit(CommandKind::SelectPlane(plane));
        }
        if let Some((units, _)) = self.units {
            emit(CommandKind::SetUnits(units));
        }
        if let Some((mode, _)) = self.distance_mode {
            emit(CommandKind::SetDistanceMode(mode));
        }
        if let Some((offset, _)) = self.work_offset {
            emit(CommandKind::SelectWorkOffset(offset));
        }

        if self.clear_axis_offset {
            emit(CommandKind::ClearAxisOffset);
        }
        for group in self
            .groups
            .iter()
            .filter(|g| g.kind == GroupKind::AxisOffset)
        {
            if group.axes.is_empty() {
                self.diagnostics.push(Diagnostic::parse(
                    line,
                    &ParseError::MissingWord {
                        code: "G92".to_string(),
                        letter: 'X',
                    },
                ));
            } else {
                emit(CommandKind::SetAxisOffset(group.axes));
            }
        }

        for group in &self.groups {
            let GroupKind::Motion(kind) = group.kind else {
                continue;
            };
            if !group.implicit {
                emit(CommandKind::SetMotionMode(kind));
            }
            if !group.has_words() {
                continue;
            }
            let command = match kind {
                MotionKind::Rapid | MotionKind::Linear => CommandKind::LinearMove {
                    rapid: kind == MotionKind::Rapid,
                    target: group.axes,
                },
                MotionKind::ArcClockwise | MotionKind::ArcCounterClockwise => {
                    if group.radius.is_some() && !group.center.is_empty() {
                        self.diagnostics.push(Diagnostic::parse_warning(
                            line,
                            "R word ignored, arc center offsets take precedence",
                        ));
                    }
                    CommandKind::ArcMove {
                        clockwise: kind == MotionKind::ArcClockwise,
                        target: group.axes,
                        center: group.center,
                        radius: group.radius,
                    }
                }
            };
            emit(command);
        }

        for action in self.program_flow.drain(..) {
            emit(CommandKind::Auxiliary(action));
        }

        ParsedLine {
            line,
            block_number: self.block_number,
            commands,
            diagnostics: self.diagnostics,
        }
    }
}

fn unknown(letter: char, raw: &str) -> ParseError {
    ParseError::UnknownCode {
        letter,
        code: raw.to_string(),
    }
}

fn invalid(letter: char, value: f64, reason: &str) -> ParseError {
    ParseError::InvalidValue {
        letter,
        value,
        reason: reason.to_string(),
    }
}

fn set_once<T>(slot: &mut Option<T>, letter: char, value: T) -> Result<(), ParseError> {
    if slot.is_some() {
        return Err(ParseError::DuplicateWord { letter });
    }
    *slot = Some(value);
    Ok(())
}

fn set_modal<T: PartialEq>(
    slot: &mut Modal<T>,
    value: T,
    code: String,
    group: &'static str,
) -> Result<(), ParseError> {
    match slot {
        Some((existing, _)) if *existing == value => Ok(()),
        Some((_, first)) => Err(ParseError::ConflictingCodes {
            group,
            first: first.clone(),
            second: code,
        }),
        None => {
            *slot = Some((value, code));
            Ok(())
        }
    }
}
