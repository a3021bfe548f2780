/// A five-point rating scale with a label per level.
#[derive(Debug, Clone, Copy)]
pub struct Scale {
    pub title: &'static str,
    pub attribute: &'static str,
    pub levels: [&'static str; 5],
}

impl Scale {
    pub fn label(&self, score: u8) -> Option<&'static str> {
        match score {
            1..=5 => Some(self.levels[(score - 1) as usize]),
            _ => None,
        }
    }
}

pub const COLOR_TYPOGRAPHY: Scale = Scale {
    title: "Color & Typography",
    attribute: "eval_visual_color_typography",
    levels: [
        "1 – Very poor: clashing colors, unreadable text",
        "2 – Poor: noticeable issues, uncomfortable to read",
        "3 – Acceptable: readable but unpolished",
        "4 – Good: pleasant, consistent, readable",
        "5 – Excellent: professional, harmonious, highly readable",
    ],
};

pub const LAYOUT: Scale = Scale {
    title: "Layout & Structure",
    attribute: "eval_layout_structure",
    levels: [
        "1 – Very poor: broken or chaotic layout",
        "2 – Poor: layout issues, poor spacing or alignment",
        "3 – Acceptable: works but feels basic",
        "4 – Good: clear structure and spacing",
        "5 – Excellent: polished, modern, well-balanced",
    ],
};

pub const CORRECTNESS: Scale = Scale {
    title: "Correctness",
    attribute: "eval_correctness",
    levels: [
        "1 – Very poor: missing most requirements",
        "2 – Poor: major omissions or misunderstandings",
        "3 – Acceptable: mostly correct with some gaps",
        "4 – Good: correct with only minor issues",
        "5 – Excellent: fully correct and complete",
    ],
};

pub const FUNCTIONALITY: Scale = Scale {
    title: "Functionality",
    attribute: "eval_functionality",
    levels: [
        "1 – Very poor: does not render or function",
        "2 – Poor: major functional problems",
        "3 – Acceptable: works with noticeable issues",
        "4 – Good: functions as expected",
        "5 – Excellent: robust, clean, no issues",
    ],
};

/// Display order in the evaluation view and in the `eval` command.
pub const ALL: [Scale; 4] = [COLOR_TYPOGRAPHY, LAYOUT, CORRECTNESS, FUNCTIONALITY];
