use crate::RuntimeError;

/// Number of cells a freshly created tape holds.
pub const TAPE_CAPACITY: usize = 30_000;

/// Fixed-size memory of wrapping 8-bit cells with a head pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tape {
    cells: Box<[u8]>,
    pointer: usize,
}

impl Default for Tape {
    fn default() -> Self {
        Self::new()
    }
}

impl Tape {
    pub fn new() -> Self {
        Self::with_capacity(TAPE_CAPACITY)
    }

    /// A zero-capacity tape is widened to one cell so the head always points somewhere.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: vec![0; capacity.max(1)].into_boxed_slice(),
            pointer: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn head_value(&self) -> u8 {
        self.cells[self.pointer]
    }

    pub fn set_head(&mut self, value: u8) {
        self.cells[self.pointer] = value;
    }

    pub fn add(&mut self, amount: usize) {
        let head = &mut self.cells[self.pointer];
        *head = head.wrapping_add(amount as u8);
    }

    pub fn sub(&mut self, amount: usize) {
        let head = &mut self.cells[self.pointer];
        *head = head.wrapping_sub(amount as u8);
    }

    /// Moves the head `amount` cells right. The pointer is left untouched on failure.
    pub fn move_right(&mut self, amount: usize) -> Result<(), RuntimeError> {
        match self.pointer.checked_add(amount) {
            Some(next) if next < self.cells.len() => {
                self.pointer = next;
                Ok(())
            }
            _ => Err(self.out_of_bounds(amount as isize)),
        }
    }

    /// Moves the head `amount` cells left. The pointer is left untouched on failure.
    pub fn move_left(&mut self, amount: usize) -> Result<(), RuntimeError> {
        let Some(next) = self.pointer.checked_sub(amount) else {
            return Err(self.out_of_bounds(-(amount as isize)));
        };
        self.pointer = next;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.cells.fill(0);
        self.pointer = 0;
    }

    fn out_of_bounds(&self, offset: isize) -> RuntimeError {
        RuntimeError::OutOfBounds {
            pointer: self.pointer,
            offset,
            capacity: self.cells.len(),
        }
    }
}

#[test]
fn test_wrapping_cells() {
    let mut tape = Tape::new();
    tape.sub(1);
    assert_eq!(tape.head_value(), 255);
    tape.add(257);
    assert_eq!(tape.head_value(), 0);
}

#[test]
fn test_move_over_leftmost() {
    let mut tape = Tape::with_capacity(4);
    tape.move_right(2).unwrap();
    let err = tape.move_left(3).expect_err("must fall off the left edge");
    assert!(matches!(
        err,
        RuntimeError::OutOfBounds {
            pointer: 2,
            offset: -3,
            capacity: 4
        }
    ));
    assert_eq!(tape.pointer(), 2);
}

#[test]
fn test_move_over_rightmost() {
    let mut tape = Tape::with_capacity(4);
    tape.move_right(3).unwrap();
    assert!(tape.move_right(1).is_err());
    assert_eq!(tape.pointer(), 3);
}
