use state_machines::state_machine;

state_machine! {
    name: UploadMachine,
    state: UploadState,
    initial: Received,
    states: [Received, Extracted, Routed, PayloadLocated, Converted, Imported, PointerUpdated, Cleaned, Failed],
    events {
        extract { transition: { from: Received, to: Extracted } }
        route { transition: { from: Extracted, to: Routed } }
        locate { transition: { from: Routed, to: PayloadLocated } }
        convert { transition: { from: PayloadLocated, to: Converted } }
        import { transition: { from: Converted, to: Imported } }
        update_pointer { transition: { from: Imported, to: PointerUpdated } }
        cleanup { transition: { from: PointerUpdated, to: Cleaned } }
        abort {
            transition: { from: Received, to: Failed }
            transition: { from: Extracted, to: Failed }
            transition: { from: Routed, to: Failed }
            transition: { from: PayloadLocated, to: Failed }
            transition: { from: Converted, to: Failed }
            transition: { from: Imported, to: Failed }
            transition: { from: PointerUpdated, to: Failed }
            transition: { from: Cleaned, to: Failed }
        }
    }
}

pub fn received() -> UploadMachine<(), Received> {
    UploadMachine::new(())
}
