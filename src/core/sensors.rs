//! Fixed sensor positions at traffic lights
//!
//! One sensor per edge controlled by a traffic light, placed at the end of
//! the edge (the stop line) at a configurable mounting height.

use log::debug;

use crate::core::emit::Position3;
use crate::core::sumo::SumoNetwork;

/// Default mounting height of a sensor, in meters
pub const DEFAULT_SENSOR_HEIGHT: f64 = 6.0;

/// Sensor positions, traffic light by traffic light
pub fn traffic_light_sensors(network: &SumoNetwork, height: f64) -> Vec<Position3> {
    let mut positions = Vec::new();
    for tls in &network.traffic_lights {
        for &idx in &tls.controlled_edges {
            let edge = network.roads.edge(idx);
            match edge.shape().last() {
                Some(&(x, y)) => positions.push(Position3 { x, y, z: height }),
                None => debug!("Edge {} controlled by {} has no geometry", edge.id, tls.id),
            }
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    const NET: &str = r#"<net>
    <edge id="a" from="n0" to="n1">
        <lane id="a_0" index="0" speed="13.89" length="20.00" shape="0,0 20,0"/>
    </edge>
    <edge id="b" from="n1" to="n2">
        <lane id="b_0" index="0" speed="13.89" length="20.00" shape="20,0 20,20"/>
    </edge>
    <edge id="c" from="n3" to="n1">
        <lane id="c_0" index="0" speed="13.89" length="10.00" shape="30,0 21,0"/>
    </edge>
    <edge id="d" from="n2" to="n0" shape="20,20 0,0"/>
    <connection from="a" to="b" tl="n1"/>
    <connection from="c" to="b" tl="n1"/>
    <connection from="b" to="a" tl="n2"/>
    <connection from="d" to="a" tl="n2"/>
</net>"#;

    #[test]
    fn test_sensor_positions() {
        let net = SumoNetwork::parse(NET).unwrap();
        let sensors = traffic_light_sensors(&net, DEFAULT_SENSOR_HEIGHT);
        assert_eq!(
            sensors,
            vec![
                Position3 { x: 20.0, y: 0.0, z: 6.0 },
                Position3 { x: 21.0, y: 0.0, z: 6.0 },
                Position3 { x: 20.0, y: 20.0, z: 6.0 },
                Position3 { x: 0.0, y: 0.0, z: 6.0 },
            ]
        );
    }

    #[test]
    fn test_no_traffic_lights() {
        let net = SumoNetwork::parse("<net/>").unwrap();
        assert!(traffic_light_sensors(&net, 3.0).is_empty());
    }
}
