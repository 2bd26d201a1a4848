use crate::error::{Error, Result};
use crate::graph::Direction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutOptions {
    pub direction: Direction,
    /// Seed for the default random source.
    pub random_seed: u64,
    pub iterations: usize,

    /// Size given to nodes that do not carry their own.
    pub node_width: f64,
    pub node_height: f64,

    /// Spring rest length, also the spacing between rank lines.
    pub ideal_edge_length: f64,
    /// Below this distance the bounded close-range repulsion applies.
    pub min_node_distance: f64,
    pub repulsion_strength: f64,
    pub close_repulsion: f64,
    pub attraction: f64,
    /// Rank-alignment pull when a node sits near its rank line.
    pub rank_alignment: f64,
    /// Rank-alignment pull when a node is more than half a rank away from its line.
    pub rank_alignment_far: f64,
    pub same_rank_push: f64,
    pub initial_damping: f64,
    pub final_damping: f64,
    /// Per-axis cap on a single step.
    pub max_displacement: f64,
    /// Bound of the random offset applied to initial positions.
    pub jitter: f64,

    pub avoid_obstacles: bool,
    pub routing_padding: f64,
    pub bundle_spacing: f64,
    /// Direction changes below this angle (radians) are dropped from routed paths.
    pub collinear_threshold: f64,

    /// Metadata field naming a node's step type (matched exactly or as a key suffix).
    pub step_type_field: String,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: Direction::TopToBottom,
            random_seed: 1,
            iterations: 110,
            node_width: 180.0,
            node_height: 60.0,
            ideal_edge_length: 180.0,
            min_node_distance: 200.0,
            repulsion_strength: 125_000.0,
            close_repulsion: 5.0,
            attraction: 0.05,
            rank_alignment: 0.1,
            rank_alignment_far: 0.3,
            same_rank_push: 0.1,
            initial_damping: 0.9,
            final_damping: 0.6,
            max_displacement: 100.0,
            jitter: 10.0,
            avoid_obstacles: true,
            routing_padding: 20.0,
            bundle_spacing: 16.0,
            collinear_threshold: 0.02,
            step_type_field: "StepType".to_string(),
        }
    }
}

impl LayoutOptions {
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("nodeWidth", self.node_width),
            ("nodeHeight", self.node_height),
            ("idealEdgeLength", self.ideal_edge_length),
            ("minNodeDistance", self.min_node_distance),
            ("maxDisplacement", self.max_displacement),
        ];
        for (name, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(Error::InvalidOptions {
                    message: format!("`{name}` must be a positive number, got {v}"),
                });
            }
        }
        let non_negative = [
            ("repulsionStrength", self.repulsion_strength),
            ("closeRepulsion", self.close_repulsion),
            ("attraction", self.attraction),
            ("rankAlignment", self.rank_alignment),
            ("rankAlignmentFar", self.rank_alignment_far),
            ("sameRankPush", self.same_rank_push),
            ("initialDamping", self.initial_damping),
            ("finalDamping", self.final_damping),
            ("jitter", self.jitter),
            ("routingPadding", self.routing_padding),
            ("bundleSpacing", self.bundle_spacing),
            ("collinearThreshold", self.collinear_threshold),
        ];
        for (name, v) in non_negative {
            if !(v.is_finite() && v >= 0.0) {
                return Err(Error::InvalidOptions {
                    message: format!("`{name}` must be a non-negative number, got {v}"),
                });
            }
        }
        Ok(())
    }
}
