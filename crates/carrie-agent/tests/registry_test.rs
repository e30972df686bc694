use std::sync::Arc;

use carrie_agent::AgentRegistry;
use carrie_types::AgentStatus;
use carrie_voice::{LiveKitConfig, VoiceService};

#[test]
fn deploy_with_livekit_issuer() {
    let service = VoiceService::new(LiveKitConfig::new("ws://localhost:7880", "devkey", "secret"));
    let registry = AgentRegistry::new(Arc::new(service));

    let agent = registry.deploy("call-1", "ai-agent").unwrap();
    assert_eq!(agent.status, AgentStatus::Pending);
    assert_eq!(agent.token.split('.').count(), 3);
    assert_eq!(registry.list_by_room("call-1").len(), 1);
}

#[test]
fn deploy_without_credentials_fails() {
    let service = VoiceService::new(LiveKitConfig::default());
    let registry = AgentRegistry::new(Arc::new(service));

    assert!(registry.deploy("call-1", "ai-agent").is_err());
    assert!(registry.list_all().is_empty());
}
