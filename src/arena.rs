use std::collections::VecDeque;

use rand::Rng;

use crate::error::Error;
use Direction::*;

pub const MIN_DIMENSION: u16 = 2;
pub const MAX_DIMENSION: u16 = 256;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Field {
    Empty,
    Snake,
    Food,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    Right = 0,
    Down = 1,
    Left = 2,
    Up = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Right, Down, Left, Up];

    /// The opposite heading, `(d + 2) mod 4`.
    pub fn reverse(self) -> Direction {
        match self {
            Right => Left,
            Down => Up,
            Left => Right,
            Up => Down,
        }
    }
}

impl Default for Direction {
    fn default() -> Self {
        Right
    }
}

impl TryFrom<u8> for Direction {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Direction::ALL
            .get(value as usize)
            .copied()
            .ok_or(Error::InvalidDirection(value))
    }
}

/// Cells touched by one successful step. `old_tail` is `None` when the snake
/// ate and grew.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Moved {
    pub new_head: usize,
    pub old_head: usize,
    pub old_tail: Option<usize>,
}

/// Square grid holding one snake and at most one piece of food.
///
/// Cells are addressed by linear index, `x = i % dimension` and
/// `y = i / dimension`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Arena {
    dimension: u16,
    cells: Vec<Field>,
    body: VecDeque<usize>,
    food: Option<usize>,
}

impl Arena {
    /// Places a two cell snake across the centre of the grid, heading right,
    /// and spawns the first food.
    pub fn new<R: Rng + ?Sized>(dimension: u16, rng: &mut R) -> Result<Self, Error> {
        if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&dimension) {
            return Err(Error::InvalidDimension(dimension));
        }

        let size = dimension as usize * dimension as usize;
        let centre = size / 2;

        let mut cells = vec![Field::Empty; size];
        cells[centre] = Field::Snake;
        cells[centre + 1] = Field::Snake;

        let mut arena = Arena {
            dimension,
            cells,
            body: VecDeque::from(vec![centre + 1, centre]),
            food: None,
        };
        arena.spawn_food(rng);

        Ok(arena)
    }

    pub fn dimension(&self) -> u16 {
        self.dimension
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn field(&self, index: usize) -> Field {
        self.cells.get(index).copied().unwrap_or(Field::Empty)
    }

    pub fn field_at(&self, x: u16, y: u16) -> Field {
        if x >= self.dimension || y >= self.dimension {
            return Field::Empty;
        }
        self.field(y as usize * self.dimension as usize + x as usize)
    }

    pub fn coords(&self, index: usize) -> (u16, u16) {
        let dim = self.dimension as usize;
        ((index % dim) as u16, (index / dim) as u16)
    }

    pub fn head(&self) -> usize {
        self.body[0]
    }

    /// Snake cells, head first.
    pub fn body(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
        self.body.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn food(&self) -> Option<usize> {
        self.food
    }

    /// The snake covers the whole grid, nothing is left to eat.
    pub fn is_full(&self) -> bool {
        self.body.len() == self.cells.len()
    }

    /// Advances the snake one cell. The arena is left untouched on error.
    pub fn move_step<R: Rng + ?Sized>(
        &mut self,
        direction: Direction,
        rng: &mut R,
    ) -> Result<Moved, Error> {
        if self.is_full() {
            return Err(Error::ObstacleHit);
        }

        let old_head = self.head();
        let new_head = self.neighbour(old_head, direction).ok_or(Error::ObstacleHit)?;

        if new_head == self.body[1] {
            return Err(Error::ReverseDirection);
        }

        let grow = match self.cells[new_head] {
            Field::Snake => return Err(Error::ObstacleHit),
            Field::Food => true,
            Field::Empty => false,
        };

        self.body.push_front(new_head);
        self.cells[new_head] = Field::Snake;

        if grow {
            self.food = None;
            self.spawn_food(rng);
            Ok(Moved { new_head, old_head, old_tail: None })
        } else {
            let old_tail = self.body.pop_back();
            if let Some(tail) = old_tail {
                self.cells[tail] = Field::Empty;
            }
            Ok(Moved { new_head, old_head, old_tail })
        }
    }

    ///////////////////////////////////////////////////////////////////////////

    fn neighbour(&self, index: usize, direction: Direction) -> Option<usize> {
        let dim = self.dimension as usize;
        let (x, y) = (index % dim, index / dim);

        match direction {
            Right if x + 1 < dim => Some(index + 1),
            Down if y + 1 < dim => Some(index + dim),
            Left if x > 0 => Some(index - 1),
            Up if y > 0 => Some(index - dim),
            _ => None,
        }
    }

    fn spawn_food<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let empty = self.cells.len() - self.body.len();
        if empty == 0 {
            return;
        }

        let rank = rng.gen_range(0..empty);
        self.food = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, field)| **field == Field::Empty)
            .map(|(index, _)| index)
            .nth(rank);

        if let Some(index) = self.food {
            self.cells[index] = Field::Food;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    /// Arena with no food at all, so movement never grows the snake.
    fn bare(dimension: u16, body: &[usize]) -> Arena {
        let size = dimension as usize * dimension as usize;
        let mut cells = vec![Field::Empty; size];
        for &i in body {
            cells[i] = Field::Snake;
        }
        Arena { dimension, cells, body: body.iter().copied().collect(), food: None }
    }

    fn assert_consistent(arena: &Arena) {
        let snake: Vec<usize> = (0..arena.size())
            .filter(|&i| arena.field(i) == Field::Snake)
            .collect();
        let mut body: Vec<usize> = arena.body().collect();
        body.sort_unstable();
        assert_eq!(snake, body, "snake cells and body disagree");

        let food: Vec<usize> = (0..arena.size())
            .filter(|&i| arena.field(i) == Field::Food)
            .collect();
        if arena.is_full() {
            assert!(food.is_empty());
            assert_eq!(arena.food(), None);
        } else {
            assert_eq!(food.len(), 1);
            assert_eq!(arena.food(), Some(food[0]));
        }
    }

    #[test]
    fn new_arena_is_centred() {
        let arena = Arena::new(10, &mut rng()).unwrap();
        assert_eq!(arena.body().collect::<Vec<_>>(), vec![51, 50]);
        assert_eq!(arena.head(), 51);
        assert_eq!(arena.coords(51), (1, 5));
        assert_consistent(&arena);
    }

    #[test]
    fn odd_dimension_keeps_snake_on_one_row() {
        let arena = Arena::new(3, &mut rng()).unwrap();
        assert_eq!(arena.body().collect::<Vec<_>>(), vec![5, 4]);
        assert_eq!(arena.coords(4).1, arena.coords(5).1);
    }

    #[test]
    fn rejects_degenerate_dimensions() {
        assert!(matches!(Arena::new(1, &mut rng()), Err(Error::InvalidDimension(1))));
        assert!(matches!(Arena::new(0, &mut rng()), Err(Error::InvalidDimension(0))));
        assert!(Arena::new(MAX_DIMENSION, &mut rng()).is_ok());
    }

    #[test]
    fn direction_from_raw() {
        assert_eq!(Direction::try_from(0).unwrap(), Right);
        assert_eq!(Direction::try_from(3).unwrap(), Up);
        assert!(matches!(Direction::try_from(4), Err(Error::InvalidDirection(4))));
        for d in Direction::ALL {
            let raw = (d as u8 + 2) % 4;
            assert_eq!(Direction::try_from(raw).unwrap(), d.reverse());
        }
    }

    #[test]
    fn runs_right_until_the_wall() {
        let mut arena = bare(10, &[51, 50]);
        let mut rng = rng();

        for expected in 52..=59 {
            arena.move_step(Right, &mut rng).unwrap();
            assert_eq!(arena.head(), expected);
            assert_consistent_bare(&arena);
        }

        let before = arena.clone();
        assert!(matches!(arena.move_step(Right, &mut rng), Err(Error::ObstacleHit)));
        assert_eq!(arena, before);
    }

    fn assert_consistent_bare(arena: &Arena) {
        let snake = (0..arena.size()).filter(|&i| arena.field(i) == Field::Snake).count();
        assert_eq!(snake, arena.len());
        assert!(arena.body().all(|i| arena.field(i) == Field::Snake));
    }

    #[test]
    fn walls_on_every_side() {
        let mut rng = rng();
        let cases = [
            (vec![9, 8], Right),
            (vec![0, 1], Left),
            (vec![3, 13], Up),
            (vec![93, 83], Down),
        ];

        for (body, direction) in cases.iter() {
            let mut arena = bare(10, body);
            let before = arena.clone();
            assert!(matches!(arena.move_step(*direction, &mut rng), Err(Error::ObstacleHit)));
            assert_eq!(arena, before);
        }
    }

    #[test]
    fn reverse_is_rejected_without_mutation() {
        let mut arena = Arena::new(10, &mut rng()).unwrap();
        let before = arena.clone();

        assert!(matches!(arena.move_step(Left, &mut rng()), Err(Error::ReverseDirection)));
        assert_eq!(arena, before);
    }

    #[test]
    fn self_collision() {
        // Head at 22 curls around; moving left hits 21.
        let mut arena = bare(10, &[22, 12, 11, 21, 31]);
        let before = arena.clone();

        assert!(matches!(arena.move_step(Left, &mut rng()), Err(Error::ObstacleHit)));
        assert_eq!(arena, before);
    }

    #[test]
    fn moving_into_the_tail_is_a_collision() {
        let mut arena = bare(10, &[22, 12, 11, 21]);
        assert!(matches!(arena.move_step(Left, &mut rng()), Err(Error::ObstacleHit)));
    }

    #[test]
    fn plain_move_keeps_length_and_frees_tail() {
        let mut arena = bare(10, &[51, 50]);

        let res = arena.move_step(Down, &mut rng()).unwrap();
        assert_eq!(res, Moved { new_head: 61, old_head: 51, old_tail: Some(50) });
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.field(50), Field::Empty);
        assert_eq!(arena.body().collect::<Vec<_>>(), vec![61, 51]);
    }

    #[test]
    fn eating_grows_and_respawns_food() {
        let mut arena = bare(10, &[51, 50]);
        arena.cells[52] = Field::Food;
        arena.food = Some(52);
        let mut rng = rng();

        let res = arena.move_step(Right, &mut rng).unwrap();
        assert_eq!(res, Moved { new_head: 52, old_head: 51, old_tail: None });
        assert_eq!(arena.len(), 3);
        assert_eq!(arena.field(50), Field::Snake);
        assert_consistent(&arena);
        assert_ne!(arena.food(), Some(52));
    }

    #[test]
    fn food_lands_on_the_only_empty_cell() {
        // 2x2 grid, snake [3, 2], food on 1, cell 0 is the last free one.
        let mut arena = bare(2, &[3, 2]);
        arena.cells[1] = Field::Food;
        arena.food = Some(1);

        arena.move_step(Up, &mut rng()).unwrap();
        assert_eq!(arena.len(), 3);
        assert_eq!(arena.food(), Some(0));
        assert_consistent(&arena);
    }

    #[test]
    fn eating_the_last_food_fills_the_grid() {
        let mut arena = bare(2, &[1, 3, 2]);
        arena.cells[0] = Field::Food;
        arena.food = Some(0);
        let mut rng = rng();

        arena.move_step(Left, &mut rng).unwrap();
        assert!(arena.is_full());
        assert_consistent(&arena);

        let before = arena.clone();
        for d in Direction::ALL {
            assert!(matches!(arena.move_step(d, &mut rng), Err(Error::ObstacleHit)));
        }
        assert_eq!(arena, before);
    }

    #[test]
    fn food_is_spread_over_empty_cells() {
        let mut rng = rng();
        let mut seen = std::collections::HashSet::new();

        for _ in 0..200 {
            let arena = Arena::new(3, &mut rng).unwrap();
            let food = arena.food().unwrap();
            assert_eq!(arena.field(food), Field::Food);
            seen.insert(food);
        }

        // 9 cells minus the two snake cells.
        assert_eq!(seen.len(), 7);
        assert!(!seen.contains(&4) && !seen.contains(&5));
    }

    #[test]
    fn random_walk_keeps_invariants() {
        let mut rng = rng();
        let mut arena = Arena::new(6, &mut rng).unwrap();

        for step in 0..500u32 {
            let direction = Direction::ALL[(step * 7 + step / 3) as usize % 4];
            let before = arena.clone();
            match arena.move_step(direction, &mut rng) {
                Ok(Moved { old_tail: Some(tail), .. }) => {
                    assert_eq!(arena.len(), before.len());
                    assert_eq!(arena.field(tail), Field::Empty);
                }
                Ok(Moved { old_tail: None, .. }) => assert_eq!(arena.len(), before.len() + 1),
                Err(_) => assert_eq!(arena, before),
            }
            assert_consistent(&arena);
        }
    }

    #[test]
    fn field_at_matches_linear_index() {
        let arena = Arena::new(10, &mut rng()).unwrap();
        assert_eq!(arena.field_at(1, 5), Field::Snake);
        assert_eq!(arena.field_at(0, 5), Field::Snake);
        assert_eq!(arena.field_at(10, 0), Field::Empty);
    }
}
