use super::pool::VariableId;
use super::rule::Literal;

/// The decision stack of one search: which variables are true or false, at
/// which level, and because of which rule.
///
/// A variable's entry is 0 while undecided, `+level` when decided true and
/// `-level` when decided false.
#[derive(Debug, Clone)]
pub struct Decisions {
    map: Vec<i32>,
    queue: Vec<(Literal, Option<usize>)>,
    level: u32,
}

impl Decisions {
    pub fn new(variable_count: usize) -> Self {
        Self {
            map: vec![0; variable_count + 1],
            queue: Vec::new(),
            level: 0,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn increment_level(&mut self) -> u32 {
        self.level += 1;
        self.level
    }

    /// Record a decision for the literal at the current level.
    pub fn decide(&mut self, literal: Literal, reason: Option<usize>) {
        let var = literal.unsigned_abs() as usize;
        debug_assert_eq!(self.map[var], 0, "variable {} already decided", var);
        self.map[var] = if literal > 0 {
            self.level as i32
        } else {
            -(self.level as i32)
        };
        self.queue.push((literal, reason));
    }

    pub fn decided(&self, variable: VariableId) -> bool {
        self.map[variable as usize] != 0
    }

    pub fn undecided(&self, variable: VariableId) -> bool {
        !self.decided(variable)
    }

    pub fn decided_true(&self, variable: VariableId) -> bool {
        self.map[variable as usize] > 0
    }

    /// Whether the literal is decided and true.
    pub fn satisfied(&self, literal: Literal) -> bool {
        let entry = self.map[literal.unsigned_abs() as usize];
        if literal > 0 {
            entry > 0
        } else {
            entry < 0
        }
    }

    /// Whether the literal is decided and false.
    pub fn conflicts(&self, literal: Literal) -> bool {
        let entry = self.map[literal.unsigned_abs() as usize];
        if literal > 0 {
            entry < 0
        } else {
            entry > 0
        }
    }

    pub fn decision_level(&self, variable: VariableId) -> u32 {
        self.map[variable as usize].unsigned_abs()
    }

    /// Undo all decisions made above the given level.
    pub fn revert_to_level(&mut self, level: u32) {
        while let Some(&(literal, _)) = self.queue.last() {
            let var = literal.unsigned_abs() as usize;
            if self.map[var].unsigned_abs() <= level {
                break;
            }
            self.map[var] = 0;
            self.queue.pop();
        }
        self.level = level;
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn queue(&self) -> &[(Literal, Option<usize>)] {
        &self.queue
    }

    /// Variables decided true, in decision order.
    pub fn selected(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.queue
            .iter()
            .filter(|(literal, _)| *literal > 0)
            .map(|(literal, _)| *literal)
    }
}
